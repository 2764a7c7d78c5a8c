//! Delimited-text reading and writing.

use crate::error::{IoError, IoResult};
use crate::schema::{FieldSpec, RowSchema};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tidyframe::{Column, Frame, Value};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Whether the first record names the columns. Without a header, columns are matched to
    /// schema fields by position.
    pub has_header: bool,
    /// Cells equal to one of these read as missing.
    pub na_tokens: Vec<String>,
    /// Only materialize these columns.
    pub columns: Option<Vec<String>>,
    /// Trim surrounding whitespace from every field.
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            na_tokens: vec![String::new(), "NA".to_string(), "NULL".to_string()],
            columns: None,
            trim: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvWriteOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Written for null and absent cells alike.
    pub na_rep: String,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            na_rep: String::new(),
        }
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> IoError {
    let reason = err.to_string();
    let pos = err.position().cloned();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => IoError::Io(e),
        _ => IoError::Parse {
            row: pos.map(|p| p.record()).filter(|r| *r > 0).unwrap_or(fallback_row),
            reason,
        },
    }
}

/// Where each field of `wanted` comes from in a source record.
///
/// Without a header, a field's source index is its position in the full `declared` schema,
/// not in the projected one.
fn locate(
    declared: &RowSchema,
    wanted: &RowSchema,
    header: Option<&StringRecord>,
) -> IoResult<Vec<Option<usize>>> {
    wanted
        .fields()
        .iter()
        .map(|field| {
            let found = match header {
                Some(header) => header.iter().position(|name| name == field.name),
                None => declared.fields().iter().position(|f| f.name == field.name),
            };
            match found {
                Some(idx) => Ok(Some(idx)),
                None if field.is_optional() => Ok(None),
                None => Err(IoError::MissingField(field.name.clone())),
            }
        })
        .collect()
}

fn read_cell(
    field: &FieldSpec,
    raw: Option<&str>,
    row: u64,
    na_tokens: &[String],
) -> IoResult<Value> {
    let Some(raw) = raw else {
        return field.missing(row);
    };
    if na_tokens.iter().any(|token| token == raw) {
        return field.missing(row);
    }
    field.kind.parse(raw).ok_or_else(|| {
        IoError::validation(row, &field.name, format!("cannot parse {raw:?} as {}", field.kind))
    })
}

/// Read delimited text into a frame, validating every row against `schema`.
///
/// The first invalid row aborts the read. Optional fields missing from the header read as
/// all-absent columns.
pub fn read_csv<R: Read>(reader: R, schema: &RowSchema, options: &CsvOptions) -> IoResult<Frame> {
    let declared = schema;
    let schema = declared.project(options.columns.as_deref())?;
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // headers are handled here so row numbers stay consistent
        .has_headers(false)
        .flexible(true)
        .trim(if options.trim {
            csv::Trim::All
        } else {
            csv::Trim::None
        })
        .from_reader(reader);

    let mut record = StringRecord::new();
    let header = if options.has_header {
        if !csv_reader
            .read_record(&mut record)
            .map_err(|e| map_csv_error(e, 0))?
        {
            return Err(IoError::Parse {
                row: 0,
                reason: "input has no header record".to_string(),
            });
        }
        Some(record.clone())
    } else {
        None
    };
    let sources = locate(declared, &schema, header.as_ref())?;

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); schema.len()];
    let mut row: u64 = 0;
    loop {
        match csv_reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                row += 1;
                for ((field, source), values) in
                    schema.fields().iter().zip(&sources).zip(columns.iter_mut())
                {
                    let raw = source.and_then(|idx| record.get(idx));
                    values.push(read_cell(field, raw, row, &options.na_tokens)?);
                }
            }
            Err(e) => return Err(map_csv_error(e, row + 1)),
        }
    }

    log::debug!("read {row} csv rows into {} columns", schema.len());
    let frame = Frame::from_columns(schema.fields().iter().zip(columns).map(|(field, values)| {
        (
            field.name.clone(),
            Column::new(values).with_optional(field.is_optional()),
        )
    }))?;
    Ok(frame)
}

pub fn read_csv_str(text: &str, schema: &RowSchema, options: &CsvOptions) -> IoResult<Frame> {
    read_csv(text.as_bytes(), schema, options)
}

pub fn read_csv_path(
    path: impl AsRef<Path>,
    schema: &RowSchema,
    options: &CsvOptions,
) -> IoResult<Frame> {
    let file = File::open(path)?;
    read_csv(std::io::BufReader::new(file), schema, options)
}

fn format_cell(value: &Value, na_rep: &str) -> String {
    if value.is_missing() {
        na_rep.to_string()
    } else {
        value.to_string()
    }
}

/// Write `frame` as delimited text. Null and absent cells are both written as `na_rep`.
pub fn write_csv<W: Write>(frame: &Frame, writer: W, options: &CsvWriteOptions) -> IoResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);
    if options.has_header {
        csv_writer
            .write_record(frame.names())
            .map_err(|e| map_csv_error(e, 0))?;
    }
    for row in frame.rows() {
        let record: Vec<String> = row
            .iter()
            .map(|(_, value)| format_cell(value, &options.na_rep))
            .collect();
        csv_writer
            .write_record(&record)
            .map_err(|e| map_csv_error(e, row.index() as u64 + 1))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_string(frame: &Frame, options: &CsvWriteOptions) -> IoResult<String> {
    let mut buf = Vec::new();
    write_csv(frame, &mut buf, options)?;
    String::from_utf8(buf)
        .map_err(|e| IoError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

pub fn write_csv_path(
    frame: &Frame,
    path: impl AsRef<Path>,
    options: &CsvWriteOptions,
) -> IoResult<()> {
    let file = File::create(path)?;
    write_csv(frame, std::io::BufWriter::new(file), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};
    use pretty_assertions::assert_eq;

    fn schema() -> RowSchema {
        RowSchema::new(vec![
            FieldSpec::required("id", FieldType::Int),
            FieldSpec::nullable("score", FieldType::Float),
            FieldSpec::optional("tag", FieldType::Str),
        ])
    }

    #[test]
    fn na_tokens_follow_field_presence() {
        let text = "id,score,tag\n1,NA,\n2,2.5,x\n";
        let frame = read_csv_str(text, &schema(), &CsvOptions::default()).unwrap();
        assert_eq!(
            frame.extract("score").unwrap(),
            vec![Value::Null, Value::Float(2.5)]
        );
        assert_eq!(frame.extract("tag").unwrap(), vec![Value::Absent, "x".into()]);
        assert!(frame.column("tag").unwrap().is_optional());
        assert!(!frame.column("score").unwrap().is_optional());
    }

    #[test]
    fn header_order_does_not_matter() {
        let text = "tag,id,score\nx,7,1\n";
        let frame = read_csv_str(text, &schema(), &CsvOptions::default()).unwrap();
        assert_eq!(frame.names(), &["id", "score", "tag"]);
        assert_eq!(
            frame.row(0).unwrap().to_vec(),
            vec![Value::Int(7), Value::Float(1.0), "x".into()]
        );
    }

    #[test]
    fn short_rows_and_headerless_input() {
        let options = CsvOptions {
            has_header: false,
            delimiter: b';',
            ..CsvOptions::default()
        };
        let frame = read_csv_str("1;0.5\n2\n", &schema(), &options).unwrap();
        assert_eq!(frame.extract("score").unwrap(), vec![Value::Float(0.5), Value::Null]);
        assert_eq!(frame.extract("tag").unwrap(), vec![Value::Absent, Value::Absent]);
    }

    #[test]
    fn headerless_allow_list_reads_declared_positions() {
        let schema = RowSchema::new(vec![
            FieldSpec::required("id", FieldType::Int),
            FieldSpec::required("name", FieldType::Str),
        ]);
        let options = CsvOptions {
            has_header: false,
            columns: Some(vec!["name".to_string()]),
            ..CsvOptions::default()
        };
        let frame = read_csv_str("1,alice\n2,bob\n", &schema, &options).unwrap();
        assert_eq!(frame.names(), &["name"]);
        assert_eq!(
            frame.extract("name").unwrap(),
            vec![Value::from("alice"), Value::from("bob")]
        );
    }

    #[test]
    fn writer_uses_na_rep_for_missing_cells() {
        let text = "id,score,tag\n1,NA,\n2,2.5,x\n";
        let frame = read_csv_str(text, &schema(), &CsvOptions::default()).unwrap();
        let options = CsvWriteOptions {
            na_rep: "NA".to_string(),
            ..CsvWriteOptions::default()
        };
        assert_eq!(
            write_csv_string(&frame, &options).unwrap(),
            "id,score,tag\n1,NA,NA\n2,2.5,x\n"
        );
    }
}
