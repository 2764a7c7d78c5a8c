use crate::column::{Column, Field};
use crate::error::{FrameError, FrameResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Per-frame execution settings, inherited by every frame derived from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameOptions {
    /// Maximum number of async row callbacks in flight at once.
    pub concurrency: NonZeroUsize,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            concurrency: NonZeroUsize::MIN,
        }
    }
}

impl FrameOptions {
    pub fn with_concurrency(concurrency: NonZeroUsize) -> Self {
        Self { concurrency }
    }
}

/// What a second `transpose` needs to restore the frame the first one consumed.
#[derive(Debug)]
pub(crate) struct TransposeMeta {
    pub(crate) optional: Vec<bool>,
    pub(crate) synthetic_labels: bool,
}

#[derive(Debug)]
struct FrameInner {
    names: Vec<String>,
    index: HashMap<String, usize>,
    columns: Vec<Column>,
    len: usize,
    row_labels: Option<Arc<[String]>>,
    transpose: Option<Arc<TransposeMeta>>,
    options: FrameOptions,
}

/// An immutable table of equal-length named columns.
///
/// Cloning is cheap: the column buffers are shared. Every verb returns a new frame and leaves its
/// input untouched.
#[derive(Clone, Debug)]
pub struct Frame {
    inner: Arc<FrameInner>,
}

impl Frame {
    pub fn empty() -> Self {
        Self::unchecked(Vec::new(), Vec::new(), 0, FrameOptions::default())
    }

    /// Build a frame from named columns, in declaration order.
    ///
    /// Fails with [`FrameError::ColumnLengthMismatch`] if the columns differ in length and with
    /// [`FrameError::DuplicateColumn`] if a name repeats.
    pub fn from_columns<N, C>(columns: impl IntoIterator<Item = (N, C)>) -> FrameResult<Self>
    where
        N: Into<String>,
        C: Into<Column>,
    {
        let (names, columns): (Vec<String>, Vec<Column>) = columns
            .into_iter()
            .map(|(name, column)| (name.into(), column.into()))
            .unzip();
        let len = columns.first().map_or(0, Column::len);
        Self::from_parts(names, columns, len, FrameOptions::default())
    }

    /// Build a frame from a header and row vectors.
    pub fn from_rows<N: Into<String>>(names: Vec<N>, rows: Vec<Vec<Value>>) -> FrameResult<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut columns: Vec<Vec<Value>> = names
            .iter()
            .map(|_| Vec::with_capacity(rows.len()))
            .collect();
        let len = rows.len();
        for row in rows {
            if row.len() != names.len() {
                return Err(FrameError::SchemaMismatch {
                    expected: names.len(),
                    actual: row.len(),
                });
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let columns = columns.into_iter().map(Column::new).collect();
        Self::from_parts(names, columns, len, FrameOptions::default())
    }

    /// Build a frame from key/value records.
    ///
    /// Column order is the first-seen key order across records. A key missing from a record
    /// leaves that cell [`Value::Absent`], and the column is marked optional.
    pub fn from_records<K, V, R>(records: impl IntoIterator<Item = R>) -> FrameResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
        R: IntoIterator<Item = (K, V)>,
    {
        let mut names: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut cells: Vec<Vec<(usize, Value)>> = Vec::new();

        for record in records {
            let mut row = Vec::new();
            for (key, value) in record {
                let key = key.into();
                let idx = match index.get(&key) {
                    Some(idx) => *idx,
                    None => {
                        let idx = names.len();
                        index.insert(key.clone(), idx);
                        names.push(key);
                        idx
                    }
                };
                row.push((idx, value.into()));
            }
            cells.push(row);
        }

        let len = cells.len();
        let mut columns: Vec<Vec<Value>> = vec![vec![Value::Absent; len]; names.len()];
        for (row_idx, row) in cells.into_iter().enumerate() {
            for (col_idx, value) in row {
                columns[col_idx][row_idx] = value;
            }
        }
        let columns = columns.into_iter().map(Column::new).collect();
        Self::from_parts(names, columns, len, FrameOptions::default())
    }

    /// Build a frame from a JSON array of objects. JSON `null` becomes [`Value::Null`]; a key
    /// missing from an object becomes [`Value::Absent`].
    pub fn from_json_records(json: &serde_json::Value) -> FrameResult<Self> {
        let serde_json::Value::Array(items) = json else {
            return Err(FrameError::InvalidArgument(
                "expected a JSON array of objects".to_string(),
            ));
        };
        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let serde_json::Value::Object(map) = item else {
                return Err(FrameError::InvalidArgument(format!(
                    "record {i} is not a JSON object"
                )));
            };
            records.push(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from(v)))
                    .collect::<Vec<_>>(),
            );
        }
        Self::from_records(records)
    }

    /// Validating constructor used by every verb.
    pub(crate) fn from_parts(
        names: Vec<String>,
        columns: Vec<Column>,
        len: usize,
        options: FrameOptions,
    ) -> FrameResult<Self> {
        debug_assert_eq!(names.len(), columns.len());
        for (name, column) in names.iter().zip(&columns) {
            if column.len() != len {
                return Err(FrameError::ColumnLengthMismatch {
                    column: name.clone(),
                    expected: len,
                    actual: column.len(),
                });
            }
        }
        let mut seen = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if seen.insert(name.clone(), idx).is_some() {
                return Err(FrameError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            inner: Arc::new(FrameInner {
                names,
                index: seen,
                columns,
                len,
                row_labels: None,
                transpose: None,
                options,
            }),
        })
    }

    fn unchecked(
        names: Vec<String>,
        columns: Vec<Column>,
        len: usize,
        options: FrameOptions,
    ) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            inner: Arc::new(FrameInner {
                names,
                index,
                columns,
                len,
                row_labels: None,
                transpose: None,
                options,
            }),
        }
    }

    /// A new frame with the same options as `self` but different contents.
    pub(crate) fn derive(
        &self,
        names: Vec<String>,
        columns: Vec<Column>,
        len: usize,
    ) -> FrameResult<Frame> {
        Self::from_parts(names, columns, len, self.inner.options)
    }

    fn rebuild(&self, f: impl FnOnce(&mut FrameInner)) -> Frame {
        let inner = &self.inner;
        let mut next = FrameInner {
            names: inner.names.clone(),
            index: inner.index.clone(),
            columns: inner.columns.clone(),
            len: inner.len,
            row_labels: inner.row_labels.clone(),
            transpose: inner.transpose.clone(),
            options: inner.options,
        };
        f(&mut next);
        Frame {
            inner: Arc::new(next),
        }
    }

    pub fn with_options(&self, options: FrameOptions) -> Frame {
        self.rebuild(|inner| inner.options = options)
    }

    pub fn options(&self) -> FrameOptions {
        self.inner.options
    }

    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.inner.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.inner.index.contains_key(name)
    }

    pub(crate) fn column_idx(&self, name: &str) -> FrameResult<usize> {
        self.inner
            .index
            .get(name)
            .copied()
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> FrameResult<&Column> {
        let idx = self.column_idx(name)?;
        Ok(&self.inner.columns[idx])
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        let idx = *self.inner.index.get(name)?;
        self.inner.columns.get(idx)
    }

    pub(crate) fn column_at(&self, idx: usize) -> &Column {
        &self.inner.columns[idx]
    }

    /// Columns with their names, in order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.inner
            .names
            .iter()
            .map(String::as_str)
            .zip(self.inner.columns.iter())
    }

    pub fn row(&self, index: usize) -> FrameResult<Row<'_>> {
        if index >= self.inner.len {
            return Err(FrameError::RowOutOfBounds {
                index,
                len: self.inner.len,
            });
        }
        Ok(Row::new(self, index))
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        (0..self.inner.len).map(move |index| Row::new(self, index))
    }

    pub fn schema(&self) -> Vec<Field> {
        self.columns()
            .map(|(name, column)| Field {
                name: name.to_string(),
                dtype: column.dtype(),
                optional: column.is_optional(),
            })
            .collect()
    }

    pub fn row_labels(&self) -> Option<&[String]> {
        self.inner.row_labels.as_deref()
    }

    /// Attach per-row labels, consumed by `transpose`.
    pub fn set_row_labels<S: Into<String>>(&self, labels: Vec<S>) -> FrameResult<Frame> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.len() {
            return Err(FrameError::ColumnLengthMismatch {
                column: "row labels".to_string(),
                expected: self.len(),
                actual: labels.len(),
            });
        }
        let labels: Arc<[String]> = labels.into();
        Ok(self.rebuild(|inner| inner.row_labels = Some(labels)))
    }

    pub fn clear_row_labels(&self) -> Frame {
        self.rebuild(|inner| inner.row_labels = None)
    }

    pub(crate) fn with_transpose_meta(&self, meta: TransposeMeta) -> Frame {
        self.rebuild(|inner| inner.transpose = Some(Arc::new(meta)))
    }

    pub(crate) fn transpose_meta(&self) -> Option<&TransposeMeta> {
        self.inner.transpose.as_deref()
    }

    /// Add `column` under `name`, replacing an existing column of that name in place.
    ///
    /// Only an empty frame without columns takes its row count from the new column; a
    /// column-less frame that still has rows keeps them.
    pub fn with_column(
        &self,
        name: impl Into<String>,
        column: impl Into<Column>,
    ) -> FrameResult<Frame> {
        let name = name.into();
        let column = column.into();
        let len = if self.width() == 0 && self.is_empty() {
            column.len()
        } else {
            self.len()
        };
        if column.len() != len {
            return Err(FrameError::ColumnLengthMismatch {
                column: name,
                expected: len,
                actual: column.len(),
            });
        }
        let labels_fit = len == self.len();
        Ok(self.rebuild(|inner| {
            let existing = inner.index.get(&name).copied();
            match existing {
                Some(idx) => inner.columns[idx] = column,
                None => {
                    inner.index.insert(name.clone(), inner.columns.len());
                    inner.names.push(name);
                    inner.columns.push(column);
                }
            }
            inner.len = len;
            inner.transpose = None;
            if !labels_fit {
                inner.row_labels = None;
            }
        }))
    }

    /// Keep only the named columns, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        let mut names = Vec::with_capacity(columns.len());
        let mut cols = Vec::with_capacity(columns.len());
        for name in columns {
            let name = name.as_ref();
            cols.push(self.column(name)?.clone());
            names.push(name.to_string());
        }
        let out = self.derive(names, cols, self.len())?;
        Ok(out.with_labels_of(self))
    }

    /// Remove the named columns. Every name must exist.
    pub fn drop<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        let mut dropped = vec![false; self.width()];
        for name in columns {
            dropped[self.column_idx(name.as_ref())?] = true;
        }
        let (names, cols) = self
            .columns()
            .zip(dropped)
            .filter(|(_, dropped)| !dropped)
            .map(|((name, column), _)| (name.to_string(), column.clone()))
            .unzip();
        let out = self.derive(names, cols, self.len())?;
        Ok(out.with_labels_of(self))
    }

    /// Rename columns given `(old, new)` pairs.
    pub fn rename<A: AsRef<str>, B: AsRef<str>>(&self, pairs: &[(A, B)]) -> FrameResult<Frame> {
        let mut names = self.inner.names.clone();
        for (old, new) in pairs {
            let idx = self.column_idx(old.as_ref())?;
            names[idx] = new.as_ref().to_string();
        }
        let out = self.derive(names, self.inner.columns.clone(), self.len())?;
        Ok(out.with_labels_of(self))
    }

    fn with_labels_of(self, source: &Frame) -> Frame {
        match &source.inner.row_labels {
            Some(labels) if labels.len() == self.len() => {
                let labels = labels.clone();
                self.rebuild(|inner| inner.row_labels = Some(labels))
            }
            _ => self,
        }
    }

    /// Gather rows by position. Column flags and row labels follow the rows.
    pub(crate) fn take(&self, indices: &[usize]) -> Frame {
        let columns = self
            .inner
            .columns
            .iter()
            .map(|column| column.take(indices))
            .collect();
        let mut out = Self::unchecked(
            self.inner.names.clone(),
            columns,
            indices.len(),
            self.inner.options,
        );
        if let Some(labels) = &self.inner.row_labels {
            let labels: Arc<[String]> = indices.iter().map(|&i| labels[i].clone()).collect();
            out = out.rebuild(|inner| inner.row_labels = Some(labels));
        }
        out
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len == other.inner.len
            && self.inner.names == other.inner.names
            && self.inner.columns == other.inner.columns
            && self.inner.row_labels == other.inner.row_labels
    }
}

/// A read-only view of one row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    frame: &'a Frame,
    index: usize,
}

impl<'a> Row<'a> {
    pub(crate) fn new(frame: &'a Frame, index: usize) -> Self {
        Self { frame, index }
    }

    /// Position of the row in the frame it was taken from.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, column: &str) -> FrameResult<&'a Value> {
        let idx = self.frame.column_idx(column)?;
        Ok(&self.frame.column_at(idx).values()[self.index])
    }

    pub fn label(&self) -> Option<&'a str> {
        self.frame
            .row_labels()
            .map(|labels| labels[self.index].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let index = self.index;
        self.frame
            .columns()
            .map(move |(name, column)| (name, &column.values()[index]))
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.iter().map(|(_, value)| value.clone()).collect()
    }
}

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
