//! One function applied across several columns.
//!
//! Output columns are named `{prefix}{column}{suffix}`; with neither set, `mutate_columns`
//! overwrites the source column.

use crate::column::Column;
use crate::error::{CallbackResult, FrameError, FrameResult};
use crate::frame::Frame;
use crate::group::GroupedFrame;
use crate::value::Value;
use std::sync::Arc;

pub type CellFn = dyn Fn(&Value) -> CallbackResult<Value> + Send + Sync;
pub type SeriesFn = dyn Fn(&[Value]) -> CallbackResult<Value> + Send + Sync;

#[derive(Clone)]
struct Naming {
    prefix: String,
    suffix: String,
}

impl Naming {
    fn name(&self, column: &str) -> String {
        format!("{}{column}{}", self.prefix, self.suffix)
    }
}

/// Per-cell functions for [`Frame::mutate_columns`].
#[derive(Clone, Default)]
pub struct MutateColumns {
    columns: Vec<String>,
    outputs: Vec<(Naming, Arc<CellFn>)>,
}

impl std::fmt::Debug for MutateColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutateColumns")
            .field("columns", &self.columns)
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

impl MutateColumns {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            outputs: Vec::new(),
        }
    }

    pub fn apply<F>(mut self, prefix: impl Into<String>, suffix: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> CallbackResult<Value> + Send + Sync + 'static,
    {
        let naming = Naming {
            prefix: prefix.into(),
            suffix: suffix.into(),
        };
        self.outputs.push((naming, Arc::new(f)));
        self
    }

    fn output_names(&self) -> Vec<String> {
        self.outputs
            .iter()
            .flat_map(|(naming, _)| self.columns.iter().map(|c| naming.name(c)))
            .collect()
    }
}

/// Whole-column aggregations for `summarise_columns`.
#[derive(Clone, Default)]
pub struct SummariseColumns {
    columns: Vec<String>,
    outputs: Vec<(Naming, Arc<SeriesFn>)>,
}

impl std::fmt::Debug for SummariseColumns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummariseColumns")
            .field("columns", &self.columns)
            .field("outputs", &self.outputs.len())
            .finish()
    }
}

impl SummariseColumns {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            outputs: Vec::new(),
        }
    }

    /// Aggregate every column with `f` into `{prefix}{column}`.
    pub fn apply<F>(mut self, prefix: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> CallbackResult<Value> + Send + Sync + 'static,
    {
        let naming = Naming {
            prefix: prefix.into(),
            suffix: String::new(),
        };
        self.outputs.push((naming, Arc::new(f)));
        self
    }

    /// One value per (function, column) for each part, in function-major order.
    fn run(&self, parts: &[Frame]) -> FrameResult<Vec<(String, Column)>> {
        let mut out = Vec::with_capacity(self.outputs.len() * self.columns.len());
        for (naming, f) in &self.outputs {
            for column in &self.columns {
                let values = parts
                    .iter()
                    .enumerate()
                    .map(|(position, part)| {
                        f(part.column(column)?.values()).map_err(|err| {
                            FrameError::callback("summarise_columns", position, err)
                        })
                    })
                    .collect::<FrameResult<Vec<_>>>()?;
                out.push((naming.name(column), Column::new(values)));
            }
        }
        Ok(out)
    }
}

impl Frame {
    /// Apply every function of `across` to every cell of its columns.
    ///
    /// A failing call aborts with [`FrameError::Callback`] carrying the row position.
    pub fn mutate_columns(&self, across: &MutateColumns) -> FrameResult<Frame> {
        let sources = across
            .columns
            .iter()
            .map(|name| self.column(name))
            .collect::<FrameResult<Vec<_>>>()?;
        let mut out = self.clone();
        for (naming, f) in &across.outputs {
            for (name, source) in across.columns.iter().zip(&sources) {
                let values = source
                    .iter()
                    .enumerate()
                    .map(|(row, value)| {
                        f(value).map_err(|err| FrameError::callback("mutate_columns", row, err))
                    })
                    .collect::<FrameResult<Vec<_>>>()?;
                out = out.with_column(naming.name(name), Column::new(values))?;
            }
        }
        Ok(out)
    }

    /// Collapse the frame to one row of per-column aggregates.
    pub fn summarise_columns(&self, across: &SummariseColumns) -> FrameResult<Frame> {
        let columns = across.run(std::slice::from_ref(self))?;
        let (names, columns) = columns.into_iter().unzip();
        self.derive(names, columns, 1)
    }
}

impl GroupedFrame {
    /// Grouped `mutate_columns`; writing to a grouping column regroups.
    pub fn mutate_columns(&self, across: &MutateColumns) -> FrameResult<GroupedFrame> {
        let frame = self.frame.mutate_columns(across)?;
        self.after_mutate(frame, &across.output_names())
    }

    /// Group keys followed by one row of aggregates per group, in group order.
    pub fn summarise_columns(&self, across: &SummariseColumns) -> FrameResult<Frame> {
        let groups = self.index.groups();
        let parts: Vec<Frame> = self.groups().map(|(_, frame)| frame).collect();
        let mut names: Vec<String> = self.group_keys().to_vec();
        let mut columns: Vec<Column> = (0..names.len())
            .map(|k| Column::new(groups.iter().map(|g| g.key()[k].clone()).collect()))
            .collect();
        for (name, column) in across.run(&parts)? {
            names.push(name);
            columns.push(column);
        }
        self.frame.derive(names, columns, groups.len())
    }
}
