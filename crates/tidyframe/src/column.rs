use crate::stats::ColumnStats;
use crate::value::{DataType, Value};
use std::sync::Arc;

/// An immutable column.
///
/// Storage is shared between every frame that carries the column unchanged; verbs build new
/// columns rather than writing into existing ones.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    values: Arc<[Value]>,
    dtype: DataType,
    optional: bool,
}

/// Schema entry for one column of a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub dtype: DataType,
    /// Whether rows may hold [`Value::Absent`] for this column.
    pub optional: bool,
}

pub(crate) fn infer_data_type(values: &[Value]) -> DataType {
    let mut found: Option<DataType> = None;
    for value in values {
        let Some(dtype) = value.data_type() else {
            continue;
        };
        found = Some(match (found, dtype) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(DataType::Int), DataType::Float) | (Some(DataType::Float), DataType::Int) => {
                DataType::Float
            }
            _ => return DataType::Mixed,
        });
    }
    found.unwrap_or(DataType::Unknown)
}

impl Column {
    pub fn new(values: Vec<Value>) -> Self {
        Self::from_arc(values.into())
    }

    pub(crate) fn from_arc(values: Arc<[Value]>) -> Self {
        let dtype = infer_data_type(&values);
        let optional = values.iter().any(Value::is_absent);
        Self {
            values,
            dtype,
            optional,
        }
    }

    /// A column of `len` copies of `value`.
    pub fn repeat(value: Value, len: usize) -> Self {
        Self::new(vec![value; len])
    }

    /// Mark the column as optional (rows may be absent) or required.
    ///
    /// A column that actually holds absent values always stays optional.
    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional || self.values.iter().any(Value::is_absent);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.values.to_vec()
    }

    pub fn stats(&self) -> ColumnStats {
        ColumnStats::compute(&self.values)
    }

    /// Whether both columns point at the same buffer.
    pub fn shares_storage_with(&self, other: &Column) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }

    /// Gather rows by position. The optional flag carries over.
    pub(crate) fn take(&self, indices: &[usize]) -> Column {
        let values: Vec<Value> = indices.iter().map(|&i| self.values[i].clone()).collect();
        Column::new(values).with_optional(self.optional)
    }

    /// Gather rows where `None` produces an absent cell; the result is optional whenever any
    /// slot can be `None`.
    pub(crate) fn take_or_absent(&self, indices: &[Option<usize>], optional: bool) -> Column {
        let values: Vec<Value> = indices
            .iter()
            .map(|idx| match idx {
                Some(i) => self.values[*i].clone(),
                None => Value::Absent,
            })
            .collect();
        Column::new(values).with_optional(optional || self.optional)
    }
}

impl From<Vec<Value>> for Column {
    fn from(values: Vec<Value>) -> Self {
        Column::new(values)
    }
}

impl<T: Into<Value>> FromIterator<T> for Column {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Column::new(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Column {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
