//! Reshaping: `pivot_wider`, `pivot_longer`, `unnest`, `transpose` and row binding.

use crate::column::Column;
use crate::error::{CallbackResult, FrameError, FrameResult};
use crate::frame::{Frame, TransposeMeta};
use crate::value::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Combines every value that lands in one `pivot_wider` cell, in row order.
pub type CellAggregateFn = dyn Fn(&[Value]) -> CallbackResult<Value> + Send + Sync;

#[derive(Clone)]
pub struct PivotWider {
    names_from: String,
    values_from: String,
    id_cols: Option<Vec<String>>,
    names_prefix: String,
    expected_columns: Option<Vec<String>>,
    aggregate: Option<Arc<CellAggregateFn>>,
}

impl fmt::Debug for PivotWider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PivotWider")
            .field("names_from", &self.names_from)
            .field("values_from", &self.values_from)
            .field("id_cols", &self.id_cols)
            .field("names_prefix", &self.names_prefix)
            .field("expected_columns", &self.expected_columns)
            .field("aggregate", &self.aggregate.is_some())
            .finish()
    }
}

impl PivotWider {
    pub fn new(names_from: impl Into<String>, values_from: impl Into<String>) -> Self {
        Self {
            names_from: names_from.into(),
            values_from: values_from.into(),
            id_cols: None,
            names_prefix: String::new(),
            expected_columns: None,
            aggregate: None,
        }
    }

    /// Columns identifying an output row. Defaults to every other column.
    pub fn id_cols<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.id_cols = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn names_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.names_prefix = prefix.into();
        self
    }

    /// Fix the produced columns (as values of the names column) and their order.
    pub fn expected_columns<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.expected_columns = Some(names.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn aggregate<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> CallbackResult<Value> + Send + Sync + 'static,
    {
        self.aggregate = Some(Arc::new(f));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PivotLonger {
    cols: Vec<String>,
    names_to: String,
    values_to: String,
    names_prefix: Option<String>,
}

impl PivotLonger {
    pub fn new<S: AsRef<str>>(cols: &[S]) -> Self {
        Self {
            cols: cols.iter().map(|c| c.as_ref().to_string()).collect(),
            names_to: "name".to_string(),
            values_to: "value".to_string(),
            names_prefix: None,
        }
    }

    pub fn names_to(mut self, name: impl Into<String>) -> Self {
        self.names_to = name.into();
        self
    }

    pub fn values_to(mut self, name: impl Into<String>) -> Self {
        self.values_to = name.into();
        self
    }

    /// Stripped from the folded column names when present.
    pub fn names_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.names_prefix = Some(prefix.into());
        self
    }
}

fn display_key(key: &[&Value]) -> String {
    let parts: Vec<String> = key.iter().map(|v| v.to_string()).collect();
    format!("({})", parts.join(", "))
}

impl Frame {
    /// Spread `values_from` into one column per distinct value of `names_from`.
    ///
    /// Output columns are named by the display form of each value, so a missing name produces a
    /// column called `null` or `absent`. Two different values with the same display form (say
    /// `1` and `"1"`) fail with [`FrameError::PivotNameCollision`].
    ///
    /// Several rows landing in the same cell need an aggregator; without one the call fails with
    /// [`FrameError::DuplicatePivotCell`]. Cells no row lands in are [`Value::Absent`].
    pub fn pivot_wider(&self, pivot: &PivotWider) -> FrameResult<Frame> {
        let names_col = self.column(&pivot.names_from)?;
        let values_col = self.column(&pivot.values_from)?;
        let id_cols: Vec<usize> = match &pivot.id_cols {
            Some(cols) => cols
                .iter()
                .map(|c| self.column_idx(c))
                .collect::<FrameResult<_>>()?,
            None => self
                .names()
                .iter()
                .enumerate()
                .filter(|(_, n)| **n != pivot.names_from && **n != pivot.values_from)
                .map(|(i, _)| i)
                .collect(),
        };

        let mut group_of: HashMap<Vec<&Value>, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Value>> = Vec::new();
        let mut found_names: Vec<String> = Vec::new();
        let mut name_of: HashMap<String, usize> = HashMap::new();
        let mut name_values: Vec<&Value> = Vec::new();
        let mut cells: HashMap<(usize, usize), Vec<Value>> = HashMap::new();

        for row in 0..self.len() {
            let key: Vec<&Value> = id_cols
                .iter()
                .map(|&c| &self.column_at(c).values()[row])
                .collect();
            let g = match group_of.get(&key) {
                Some(&g) => g,
                None => {
                    let g = groups.len();
                    group_of.insert(key.clone(), g);
                    groups.push(key);
                    g
                }
            };
            let name_value = &names_col.values()[row];
            let name = name_value.to_string();
            let n = match name_of.get(&name) {
                Some(&n) if name_values[n] == name_value => n,
                Some(&n) => {
                    return Err(FrameError::PivotNameCollision {
                        column: pivot.names_from.clone(),
                        name,
                        first: format!("{:?}", name_values[n]),
                        second: format!("{name_value:?}"),
                    })
                }
                None => {
                    let n = found_names.len();
                    name_of.insert(name.clone(), n);
                    found_names.push(name);
                    name_values.push(name_value);
                    n
                }
            };
            cells
                .entry((g, n))
                .or_default()
                .push(values_col.values()[row].clone());
        }

        // output name order, and which found name feeds each output column
        let (out_names, sources): (Vec<String>, Vec<Option<usize>>) = match &pivot
            .expected_columns
        {
            Some(expected) => {
                let listed: HashSet<&String> = expected.iter().collect();
                let unexpected: Vec<String> = found_names
                    .iter()
                    .filter(|n| !listed.contains(n))
                    .cloned()
                    .collect();
                if !unexpected.is_empty() {
                    return Err(FrameError::UnexpectedPivotNames {
                        column: pivot.names_from.clone(),
                        unexpected,
                    });
                }
                expected
                    .iter()
                    .map(|n| (n.clone(), name_of.get(n).copied()))
                    .unzip()
            }
            None => found_names
                .iter()
                .enumerate()
                .map(|(i, n)| (n.clone(), Some(i)))
                .unzip(),
        };

        let mut names: Vec<String> = id_cols.iter().map(|&c| self.names()[c].clone()).collect();
        let mut columns: Vec<Column> = id_cols
            .iter()
            .enumerate()
            .map(|(k, &c)| {
                let values = groups.iter().map(|key| key[k].clone()).collect();
                Column::new(values).with_optional(self.column_at(c).is_optional())
            })
            .collect();

        for (name, source) in out_names.iter().zip(&sources) {
            let mut values = Vec::with_capacity(groups.len());
            for (g, key) in groups.iter().enumerate() {
                let cell = source.and_then(|n| cells.get(&(g, n)));
                let value = match (cell, &pivot.aggregate) {
                    (None, _) => Value::Absent,
                    (Some(items), Some(aggregate)) => aggregate(items.as_slice())
                        .map_err(|err| FrameError::callback("pivot_wider", g, err))?,
                    (Some(items), None) if items.len() == 1 => items[0].clone(),
                    (Some(_), None) => {
                        return Err(FrameError::DuplicatePivotCell {
                            name: name.clone(),
                            row_key: display_key(key),
                        })
                    }
                };
                values.push(value);
            }
            names.push(format!("{}{name}", pivot.names_prefix));
            columns.push(Column::new(values).with_optional(values_col.is_optional()));
        }

        log::debug!(
            "pivot_wider: {} rows -> {} rows x {} value columns",
            self.len(),
            groups.len(),
            out_names.len()
        );
        self.derive(names, columns, groups.len())
    }

    /// Fold `cols` into a name column and a value column, one row per (row, folded column).
    pub fn pivot_longer(&self, pivot: &PivotLonger) -> FrameResult<Frame> {
        if pivot.cols.is_empty() {
            return Err(FrameError::InvalidArgument(
                "pivot_longer needs at least one column to fold".to_string(),
            ));
        }
        let folded: Vec<usize> = pivot
            .cols
            .iter()
            .map(|c| self.column_idx(c))
            .collect::<FrameResult<_>>()?;
        let kept: Vec<usize> = (0..self.width()).filter(|c| !folded.contains(c)).collect();

        let len = self.len() * folded.len();
        let mut source_rows = Vec::with_capacity(len);
        let mut name_values = Vec::with_capacity(len);
        let mut values = Vec::with_capacity(len);
        let labels: Vec<Value> = folded
            .iter()
            .map(|&c| {
                let name = self.names()[c].as_str();
                let name = match &pivot.names_prefix {
                    Some(prefix) => name.strip_prefix(prefix.as_str()).unwrap_or(name),
                    None => name,
                };
                Value::from(name)
            })
            .collect();
        for row in 0..self.len() {
            for (i, &c) in folded.iter().enumerate() {
                source_rows.push(row);
                name_values.push(labels[i].clone());
                values.push(self.column_at(c).values()[row].clone());
            }
        }

        let mut names: Vec<String> = kept.iter().map(|&c| self.names()[c].clone()).collect();
        let mut columns: Vec<Column> = kept
            .iter()
            .map(|&c| self.column_at(c).take(&source_rows))
            .collect();
        let optional = folded.iter().any(|&c| self.column_at(c).is_optional());
        names.push(pivot.names_to.clone());
        columns.push(Column::new(name_values));
        names.push(pivot.values_to.clone());
        columns.push(Column::new(values).with_optional(optional));
        self.derive(names, columns, len)
    }

    /// One output row per element of the list cells in `column`.
    ///
    /// An empty list still produces one row, holding [`Value::Absent`]. A cell that is not a
    /// list (including a missing one) passes through as a single row.
    pub fn unnest(&self, column: &str) -> FrameResult<Frame> {
        let target = self.column_idx(column)?;
        let mut source_rows = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());
        for (row, cell) in self.column_at(target).iter().enumerate() {
            match cell.as_list() {
                Some([]) => {
                    source_rows.push(row);
                    values.push(Value::Absent);
                }
                Some(items) => {
                    for item in items {
                        source_rows.push(row);
                        values.push(item.clone());
                    }
                }
                None => {
                    source_rows.push(row);
                    values.push(cell.clone());
                }
            }
        }

        let columns = (0..self.width())
            .map(|c| {
                if c == target {
                    Column::new(std::mem::take(&mut values))
                        .with_optional(self.column_at(c).is_optional())
                } else {
                    self.column_at(c).take(&source_rows)
                }
            })
            .collect();
        self.derive(self.names().to_vec(), columns, source_rows.len())
    }

    /// Swap rows and columns.
    ///
    /// `number_of_rows` is the expected output row count, i.e. the current column count. Output
    /// columns are named after the row labels (`row_0`, `row_1`, ... without labels) and the old
    /// column names become the row labels. Transposing the result again restores the original
    /// columns, their optional flags and (absent) labels.
    pub fn transpose(&self, number_of_rows: usize) -> FrameResult<Frame> {
        if number_of_rows != self.width() {
            return Err(FrameError::TransposeRowCount {
                expected: number_of_rows,
                actual: self.width(),
            });
        }
        let names: Vec<String> = match self.row_labels() {
            Some(labels) => labels.to_vec(),
            None => (0..self.len()).map(|i| format!("row_{i}")).collect(),
        };
        let restore = self
            .transpose_meta()
            .filter(|meta| meta.optional.len() == self.len());

        let columns: Vec<Column> = (0..self.len())
            .map(|row| {
                let column: Column = self
                    .columns()
                    .map(|(_, column)| column.values()[row].clone())
                    .collect();
                match restore {
                    Some(meta) => column.with_optional(meta.optional[row]),
                    None => column,
                }
            })
            .collect();

        let mut out = self.derive(names, columns, self.width())?;
        if !restore.is_some_and(|meta| meta.synthetic_labels) {
            out = out.set_row_labels(self.names().to_vec())?;
        }
        Ok(out.with_transpose_meta(TransposeMeta {
            optional: self.columns().map(|(_, c)| c.is_optional()).collect(),
            synthetic_labels: self.row_labels().is_none(),
        }))
    }

    /// Stack frames vertically. Columns are the union in first-seen order; a column missing
    /// from one input is [`Value::Absent`] for its rows and optional in the result.
    pub fn bind_rows(frames: &[Frame]) -> FrameResult<Frame> {
        let Some(first) = frames.first() else {
            return Ok(Frame::empty());
        };
        let mut names: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for frame in frames {
            for name in frame.names() {
                if seen.insert(name.as_str()) {
                    names.push(name.clone());
                }
            }
        }
        let len: usize = frames.iter().map(Frame::len).sum();
        let columns = names
            .iter()
            .map(|name| {
                let mut values = Vec::with_capacity(len);
                let mut optional = false;
                for frame in frames {
                    match frame.get_column(name) {
                        Some(column) => {
                            optional |= column.is_optional();
                            values.extend_from_slice(column.values());
                        }
                        None => {
                            optional |= !frame.is_empty();
                            values.extend(std::iter::repeat(Value::Absent).take(frame.len()));
                        }
                    }
                }
                Column::new(values).with_optional(optional)
            })
            .collect();
        first.derive(names, columns, len)
    }

    /// `rows` stacked after this frame, as in [`Frame::bind_rows`].
    pub fn append(&self, rows: &Frame) -> FrameResult<Frame> {
        Frame::bind_rows(&[self.clone(), rows.clone()])
    }

    /// `rows` stacked before this frame. Column order and options still come from `self`.
    pub fn prepend(&self, rows: &Frame) -> FrameResult<Frame> {
        let stacked = Frame::bind_rows(&[rows.clone(), self.clone()])?;
        let mut seen = HashSet::new();
        let order: Vec<&str> = self
            .names()
            .iter()
            .chain(rows.names())
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect();
        Ok(stacked.select(&order)?.with_options(self.options()))
    }
}
