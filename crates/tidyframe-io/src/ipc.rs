//! Arrow IPC stream reading and writing.
//!
//! Field types map to Arrow as int -> `Int64`, float -> `Float64`, string -> `Utf8`,
//! bool -> `Boolean` and datetime -> `Timestamp(ms, "UTC")`. Arrow only knows null, so an absent
//! cell is written as null; optional fields are tagged in their field metadata, and a reader
//! turns nulls of an optional field back into absent values.

use crate::error::{IoError, IoResult};
use crate::schema::{FieldSpec, FieldType, Presence, RowSchema};
use arrow_array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeStringArray, RecordBatch, RecordBatchOptions, StringArray, TimestampMillisecondArray,
};
use arrow_ipc::reader::StreamReader;
use arrow_ipc::writer::StreamWriter;
use arrow_schema::{DataType as ArrowType, Field, Schema, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tidyframe::{Column, Frame, Value};

const PRESENCE_KEY: &str = "tidyframe.presence";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcOptions {
    /// Only materialize these columns.
    pub columns: Option<Vec<String>>,
}

fn arrow_type(kind: FieldType) -> ArrowType {
    match kind {
        FieldType::Int => ArrowType::Int64,
        FieldType::Float => ArrowType::Float64,
        FieldType::Str => ArrowType::Utf8,
        FieldType::Bool => ArrowType::Boolean,
        FieldType::DateTime => ArrowType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
    }
}

fn arrow_field(declared: &FieldSpec) -> Field {
    let field = Field::new(
        declared.name.as_str(),
        arrow_type(declared.kind),
        declared.presence != Presence::Required,
    );
    if declared.is_optional() {
        field.with_metadata(HashMap::from([(
            PRESENCE_KEY.to_string(),
            "optional".to_string(),
        )]))
    } else {
        field
    }
}

fn encode(kind: FieldType, values: &[Value]) -> ArrayRef {
    match kind {
        FieldType::Int => Arc::new(values.iter().map(Value::as_i64).collect::<Int64Array>()),
        FieldType::Float => Arc::new(values.iter().map(Value::as_f64).collect::<Float64Array>()),
        FieldType::Str => Arc::new(values.iter().map(Value::as_str).collect::<StringArray>()),
        FieldType::Bool => Arc::new(values.iter().map(Value::as_bool).collect::<BooleanArray>()),
        FieldType::DateTime => Arc::new(
            values
                .iter()
                .map(|v| v.as_datetime().map(|dt| dt.timestamp_millis()))
                .collect::<TimestampMillisecondArray>()
                .with_timezone("UTC"),
        ),
    }
}

/// Write `frame` as one Arrow IPC stream batch, checking every cell against `schema`.
///
/// Frame columns not in the schema are left out; an optional field the frame lacks is written
/// as all null.
pub fn write_ipc<W: Write>(frame: &Frame, schema: &RowSchema, writer: W) -> IoResult<()> {
    let arrow_schema = Arc::new(Schema::new(
        schema.fields().iter().map(arrow_field).collect::<Vec<_>>(),
    ));

    let mut arrays = Vec::with_capacity(schema.len());
    for declared in schema.fields() {
        let values: Vec<Value> = match frame.get_column(&declared.name) {
            Some(column) => column
                .iter()
                .enumerate()
                .map(|(i, value)| declared.conform(value, i as u64 + 1))
                .collect::<IoResult<_>>()?,
            None if declared.is_optional() => vec![Value::Absent; frame.len()],
            None => return Err(IoError::MissingField(declared.name.clone())),
        };
        arrays.push(encode(declared.kind, &values));
    }

    let batch = RecordBatch::try_new_with_options(
        arrow_schema.clone(),
        arrays,
        &RecordBatchOptions::new().with_row_count(Some(frame.len())),
    )?;
    let mut stream = StreamWriter::try_new(writer, &arrow_schema)?;
    stream.write(&batch)?;
    stream.finish()?;
    log::debug!("wrote {} rows x {} columns as arrow ipc", frame.len(), schema.len());
    Ok(())
}

pub fn write_ipc_bytes(frame: &Frame, schema: &RowSchema) -> IoResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_ipc(frame, schema, &mut buf)?;
    Ok(buf)
}

pub fn write_ipc_path(frame: &Frame, schema: &RowSchema, path: impl AsRef<Path>) -> IoResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_ipc(frame, schema, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// A typed view of one Arrow column.
enum Decoder<'a> {
    Int64(&'a Int64Array),
    Int32(&'a Int32Array),
    Float64(&'a Float64Array),
    Float32(&'a Float32Array),
    Utf8(&'a StringArray),
    LargeUtf8(&'a LargeStringArray),
    Bool(&'a BooleanArray),
    Millis(&'a TimestampMillisecondArray),
}

impl<'a> Decoder<'a> {
    fn new(declared: &FieldSpec, array: &'a ArrayRef) -> IoResult<Self> {
        let any = array.as_any();
        let decoder = match (declared.kind, array.data_type()) {
            (FieldType::Int, ArrowType::Int64) => any.downcast_ref().map(Decoder::Int64),
            (FieldType::Int, ArrowType::Int32) => any.downcast_ref().map(Decoder::Int32),
            (FieldType::Float, ArrowType::Float64) => any.downcast_ref().map(Decoder::Float64),
            (FieldType::Float, ArrowType::Float32) => any.downcast_ref().map(Decoder::Float32),
            (FieldType::Str, ArrowType::Utf8) => any.downcast_ref().map(Decoder::Utf8),
            (FieldType::Str, ArrowType::LargeUtf8) => any.downcast_ref().map(Decoder::LargeUtf8),
            (FieldType::Bool, ArrowType::Boolean) => any.downcast_ref().map(Decoder::Bool),
            (FieldType::DateTime, ArrowType::Timestamp(TimeUnit::Millisecond, _)) => {
                any.downcast_ref().map(Decoder::Millis)
            }
            _ => None,
        };
        decoder.ok_or_else(|| IoError::SchemaMismatch {
            column: declared.name.clone(),
            reason: format!("expected {}, found Arrow {}", declared.kind, array.data_type()),
        })
    }

    /// The cell at `i`, or `None` when it is null.
    fn get(&self, i: usize) -> Option<Value> {
        match self {
            Decoder::Int64(a) => a.is_valid(i).then(|| Value::Int(a.value(i))),
            Decoder::Int32(a) => a.is_valid(i).then(|| Value::Int(a.value(i).into())),
            Decoder::Float64(a) => a.is_valid(i).then(|| Value::Float(a.value(i))),
            Decoder::Float32(a) => a.is_valid(i).then(|| Value::Float(a.value(i).into())),
            Decoder::Utf8(a) => a.is_valid(i).then(|| Value::str(a.value(i))),
            Decoder::LargeUtf8(a) => a.is_valid(i).then(|| Value::str(a.value(i))),
            Decoder::Bool(a) => a.is_valid(i).then(|| Value::Bool(a.value(i))),
            Decoder::Millis(a) => a.is_valid(i).then(|| Value::from_millis(a.value(i))),
        }
    }
}

/// Read an Arrow IPC stream into a frame, validating every row against `schema`.
///
/// Nulls read as [`Value::Null`] in nullable fields and [`Value::Absent`] in optional ones; a
/// null in a required field aborts the read with the 1-based row number.
pub fn read_ipc<R: Read>(reader: R, schema: &RowSchema, options: &IpcOptions) -> IoResult<Frame> {
    let schema = schema.project(options.columns.as_deref())?;
    let stream = StreamReader::try_new(reader, None)?;
    let source = stream.schema();
    let sources: Vec<Option<usize>> = schema
        .fields()
        .iter()
        .map(|declared| match source.index_of(&declared.name) {
            Ok(idx) => Ok(Some(idx)),
            Err(_) if declared.is_optional() => Ok(None),
            Err(_) => Err(IoError::MissingField(declared.name.clone())),
        })
        .collect::<IoResult<_>>()?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); schema.len()];
    let mut row: u64 = 0;
    for batch in stream {
        let batch = batch?;
        let decoders = schema
            .fields()
            .iter()
            .zip(&sources)
            .map(|(declared, source)| {
                source
                    .map(|idx| Decoder::new(declared, batch.column(idx)))
                    .transpose()
            })
            .collect::<IoResult<Vec<_>>>()?;
        for i in 0..batch.num_rows() {
            row += 1;
            for ((declared, decoder), values) in
                schema.fields().iter().zip(&decoders).zip(columns.iter_mut())
            {
                let value = match decoder.as_ref().and_then(|d| d.get(i)) {
                    Some(value) => value,
                    None => declared.missing(row)?,
                };
                values.push(value);
            }
        }
    }

    log::debug!("read {row} arrow ipc rows into {} columns", schema.len());
    let frame = Frame::from_columns(schema.fields().iter().zip(columns).map(|(declared, values)| {
        (
            declared.name.clone(),
            Column::new(values).with_optional(declared.is_optional()),
        )
    }))?;
    Ok(frame)
}

pub fn read_ipc_bytes(bytes: &[u8], schema: &RowSchema, options: &IpcOptions) -> IoResult<Frame> {
    read_ipc(bytes, schema, options)
}

pub fn read_ipc_path(
    path: impl AsRef<Path>,
    schema: &RowSchema,
    options: &IpcOptions,
) -> IoResult<Frame> {
    let file = File::open(path)?;
    read_ipc(BufReader::new(file), schema, options)
}

/// The row schema an IPC stream declares, recovering optional fields from their metadata.
pub fn ipc_schema<R: Read>(reader: R) -> IoResult<RowSchema> {
    let stream = StreamReader::try_new(reader, None)?;
    let fields = stream
        .schema()
        .fields()
        .iter()
        .map(|field| {
            let kind = match field.data_type() {
                ArrowType::Int64 | ArrowType::Int32 => FieldType::Int,
                ArrowType::Float64 | ArrowType::Float32 => FieldType::Float,
                ArrowType::Utf8 | ArrowType::LargeUtf8 => FieldType::Str,
                ArrowType::Boolean => FieldType::Bool,
                ArrowType::Timestamp(TimeUnit::Millisecond, _) => FieldType::DateTime,
                other => {
                    return Err(IoError::SchemaMismatch {
                        column: field.name().clone(),
                        reason: format!("Arrow {other} has no field type"),
                    })
                }
            };
            let tagged = field.metadata().get(PRESENCE_KEY).map(String::as_str);
            let presence = if tagged == Some("optional") {
                Presence::Optional
            } else if field.is_nullable() {
                Presence::Nullable
            } else {
                Presence::Required
            };
            Ok(FieldSpec::new(field.name().clone(), kind, presence))
        })
        .collect::<IoResult<Vec<_>>>()?;
    Ok(RowSchema::new(fields))
}
