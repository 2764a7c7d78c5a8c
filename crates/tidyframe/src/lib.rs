//! In-memory columnar table transformations.
//!
//! This crate focuses on:
//! - Immutable frames of equal-length, `Arc`-shared columns with a two-state missing model
//!   (`Null` vs `Absent`).
//! - A verb vocabulary composed by chaining: `mutate`, `filter`, `group_by`/`summarise`,
//!   `arrange` and slicing, equality and as-of joins, pivots, `unnest` and `transpose`.
//! - Cross tabulation, plus removal or filling of missing cells.
//! - Grouping as a separate value ([`GroupedFrame`]) so grouped verbs always regroup or ungroup.
//! - Async row callbacks run through a bounded, order-preserving scheduler.

#![forbid(unsafe_code)]

mod across;
mod asof;
mod callback;
mod column;
mod crosstab;
mod error;
mod frame;
mod group;
mod join;
mod missing;
mod mutate;
mod reshape;
mod rows;
mod scheduler;
pub mod stats;
mod summarise;
mod value;
pub mod window;

pub use crate::across::{CellFn, MutateColumns, SeriesFn, SummariseColumns};
pub use crate::asof::{AsofDirection, AsofOptions};
pub use crate::callback::{AsyncRowFn, RowFn, SyncRowFn};
pub use crate::column::{Column, Field};
pub use crate::crosstab::CrossTab;
pub use crate::frame::{Frame, FrameOptions, Row};
pub use crate::group::{Group, GroupIndex, GroupedFrame};
pub use crate::join::{JoinKeys, JoinKind, JoinOptions};
pub use crate::mutate::Mutation;
pub use crate::reshape::{CellAggregateFn, PivotLonger, PivotWider};
pub use crate::rows::SortKey;
pub use crate::stats::ColumnStats;
pub use crate::summarise::{AggregateFn, Summary};
pub use crate::value::{DataType, Opaque, Value};
pub use crate::window::{FoldMode, InterpolationMethod, RankOptions, TieMethod};

pub use crate::error::{CallbackError, CallbackResult, FrameError, FrameResult};
