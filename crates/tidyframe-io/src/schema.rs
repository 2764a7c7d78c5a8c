//! Declared row schemas that readers validate against and writers encode with.

use crate::error::{IoError, IoResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tidyframe::{DataType, Frame, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    Str,
    Bool,
    /// UTC timestamps with millisecond precision.
    DateTime,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Str => "string",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
        })
    }
}

impl FieldType {
    /// Parse a text cell. `None` when the text is not a valid value of this type.
    pub fn parse(&self, text: &str) -> Option<Value> {
        match self {
            FieldType::Int => text.parse::<i64>().ok().map(Value::Int),
            FieldType::Float => text.parse::<f64>().ok().map(Value::Float),
            FieldType::Str => Some(Value::str(text)),
            FieldType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            FieldType::DateTime => parse_datetime(text).map(Value::DateTime),
        }
    }

    fn of(dtype: DataType) -> Option<FieldType> {
        match dtype {
            DataType::Int => Some(FieldType::Int),
            DataType::Float => Some(FieldType::Float),
            DataType::Str | DataType::Unknown => Some(FieldType::Str),
            DataType::Bool => Some(FieldType::Bool),
            DataType::DateTime => Some(FieldType::DateTime),
            DataType::List | DataType::Object | DataType::Error | DataType::Mixed => None,
        }
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]` (read as UTC) or a bare `YYYY-MM-DD`.
fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whether a field may hold a missing value, and which kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Every row has a value.
    #[default]
    Required,
    /// Missing cells read as [`Value::Null`].
    Nullable,
    /// Missing cells read as [`Value::Absent`]; the column may also be missing from the source.
    Optional,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldType,
    #[serde(default)]
    pub presence: Presence,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldType, presence: Presence) -> Self {
        Self {
            name: name.into(),
            kind,
            presence,
        }
    }

    pub fn required(name: impl Into<String>, kind: FieldType) -> Self {
        Self::new(name, kind, Presence::Required)
    }

    pub fn nullable(name: impl Into<String>, kind: FieldType) -> Self {
        Self::new(name, kind, Presence::Nullable)
    }

    pub fn optional(name: impl Into<String>, kind: FieldType) -> Self {
        Self::new(name, kind, Presence::Optional)
    }

    pub fn is_optional(&self) -> bool {
        self.presence == Presence::Optional
    }

    /// The value a missing cell of this field reads as, or a validation error for required
    /// fields.
    pub(crate) fn missing(&self, row: u64) -> IoResult<Value> {
        match self.presence {
            Presence::Required => Err(IoError::validation(
                row,
                &self.name,
                "required field has no value",
            )),
            Presence::Nullable => Ok(Value::Null),
            Presence::Optional => Ok(Value::Absent),
        }
    }

    /// Check `value` against this field, widening ints for float fields.
    pub(crate) fn conform(&self, value: &Value, row: u64) -> IoResult<Value> {
        match value {
            Value::Null if self.presence != Presence::Required => return Ok(Value::Null),
            Value::Absent if self.presence == Presence::Optional => return Ok(Value::Absent),
            Value::Null | Value::Absent => {
                return Err(IoError::validation(
                    row,
                    &self.name,
                    format!("{value} is not allowed in a {:?} field", self.presence),
                ))
            }
            _ => {}
        }
        let ok = match (self.kind, value) {
            (FieldType::Int, Value::Int(_))
            | (FieldType::Float, Value::Float(_))
            | (FieldType::Str, Value::Str(_))
            | (FieldType::Bool, Value::Bool(_))
            | (FieldType::DateTime, Value::DateTime(_)) => true,
            (FieldType::Float, Value::Int(v)) => return Ok(Value::Float(*v as f64)),
            _ => false,
        };
        if ok {
            Ok(value.clone())
        } else {
            Err(IoError::validation(
                row,
                &self.name,
                format!(
                    "expected {}, found {}",
                    self.kind,
                    value.data_type().unwrap_or(DataType::Unknown)
                ),
            ))
        }
    }
}

/// The declared shape of every row: field names, types and presence, in column order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSchema {
    fields: Vec<FieldSpec>,
}

impl RowSchema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Derive a schema from a frame's column types.
    ///
    /// Optional columns become optional fields, columns holding nulls become nullable and the
    /// rest required. Columns of lists, objects, errors or mixed values have no field type.
    pub fn from_frame(frame: &Frame) -> IoResult<Self> {
        let fields = frame
            .columns()
            .map(|(name, column)| {
                let kind = FieldType::of(column.dtype()).ok_or_else(|| IoError::SchemaMismatch {
                    column: name.to_string(),
                    reason: format!("{} columns cannot be written", column.dtype()),
                })?;
                let presence = if column.is_optional() {
                    Presence::Optional
                } else if column.iter().any(Value::is_missing) {
                    Presence::Nullable
                } else {
                    Presence::Required
                };
                Ok(FieldSpec::new(name, kind, presence))
            })
            .collect::<IoResult<_>>()?;
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only `columns`, in schema order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> IoResult<RowSchema> {
        for column in columns {
            if self.field(column.as_ref()).is_none() {
                return Err(IoError::UnknownColumn(column.as_ref().to_string()));
            }
        }
        let fields = self
            .fields
            .iter()
            .filter(|f| columns.iter().any(|c| c.as_ref() == f.name))
            .cloned()
            .collect();
        Ok(Self { fields })
    }

    pub(crate) fn project(&self, columns: Option<&[String]>) -> IoResult<RowSchema> {
        match columns {
            Some(columns) => self.select(columns),
            None => Ok(self.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tidyframe::Column;

    #[test]
    fn parses_text_per_type() {
        assert_eq!(FieldType::Int.parse("42"), Some(Value::Int(42)));
        assert_eq!(FieldType::Int.parse("4.2"), None);
        assert_eq!(FieldType::Float.parse("4.5"), Some(Value::Float(4.5)));
        assert_eq!(FieldType::Bool.parse("TRUE"), Some(Value::Bool(true)));
        assert_eq!(FieldType::Bool.parse("yes"), None);
        assert_eq!(
            FieldType::DateTime.parse("2024-01-02"),
            Some(Value::from_millis(1_704_153_600_000))
        );
        assert_eq!(
            FieldType::DateTime.parse("2024-01-02T00:00:01Z"),
            Some(Value::from_millis(1_704_153_601_000))
        );
    }

    #[test]
    fn conform_checks_presence_and_type() {
        let price = FieldSpec::required("price", FieldType::Float);
        assert_eq!(price.conform(&Value::Int(3), 1).unwrap(), Value::Float(3.0));
        assert!(matches!(
            price.conform(&Value::Null, 2),
            Err(IoError::Validation { row: 2, .. })
        ));
        assert!(price.conform(&Value::from("x"), 1).is_err());

        let note = FieldSpec::nullable("note", FieldType::Str);
        assert_eq!(note.conform(&Value::Null, 1).unwrap(), Value::Null);
        assert!(note.conform(&Value::Absent, 1).is_err());
        assert_eq!(
            FieldSpec::optional("note", FieldType::Str).missing(1).unwrap(),
            Value::Absent
        );
    }

    #[test]
    fn infers_schema_from_frame() {
        let frame = Frame::from_columns([
            ("id", Column::from_iter([1, 2])),
            ("score", Column::new(vec![Value::Float(1.5), Value::Null])),
            ("tag", Column::new(vec![Value::Absent, Value::from("x")])),
        ])
        .unwrap();
        let schema = RowSchema::from_frame(&frame).unwrap();
        assert_eq!(
            schema.fields(),
            &[
                FieldSpec::required("id", FieldType::Int),
                FieldSpec::nullable("score", FieldType::Float),
                FieldSpec::optional("tag", FieldType::Str),
            ]
        );
    }

    #[test]
    fn select_rejects_undeclared_columns() {
        let schema = RowSchema::new(vec![
            FieldSpec::required("a", FieldType::Int),
            FieldSpec::required("b", FieldType::Int),
        ]);
        assert_eq!(schema.select(&["b"]).unwrap().fields()[0].name, "b");
        assert!(matches!(schema.select(&["c"]), Err(IoError::UnknownColumn(c)) if c == "c"));
    }

    #[test]
    fn schemas_load_from_json() {
        let schema: RowSchema = serde_json::from_str(
            r#"{"fields": [{"name": "id", "kind": "int"}, {"name": "at", "kind": "date_time", "presence": "optional"}]}"#,
        )
        .unwrap();
        assert_eq!(schema.fields()[0].presence, Presence::Required);
        assert_eq!(schema.fields()[1], FieldSpec::optional("at", FieldType::DateTime));
    }
}
