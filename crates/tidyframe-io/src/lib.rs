//! Schema-validated readers and writers for [`tidyframe::Frame`].
//!
//! Every reader takes a declared [`RowSchema`]; field presence decides how a missing cell reads
//! (`Required` fails, `Nullable` gives [`tidyframe::Value::Null`], `Optional` gives
//! [`tidyframe::Value::Absent`]) and the first row that does not fit aborts the read.
//!
//! Arrow IPC support lives behind the `arrow` feature.

#![forbid(unsafe_code)]

mod delimited;
mod error;
#[cfg(feature = "arrow")]
mod ipc;
mod schema;

pub use crate::delimited::{
    read_csv, read_csv_path, read_csv_str, write_csv, write_csv_path, write_csv_string,
    CsvOptions, CsvWriteOptions,
};
pub use crate::error::{IoError, IoResult};
#[cfg(feature = "arrow")]
pub use crate::ipc::{
    ipc_schema, read_ipc, read_ipc_bytes, read_ipc_path, write_ipc, write_ipc_bytes,
    write_ipc_path, IpcOptions,
};
pub use crate::schema::{FieldSpec, FieldType, Presence, RowSchema};
