//! Row reordering, positional/statistical slicing and extraction.
//!
//! On a [`GroupedFrame`] the slicing verbs act within each group, in group order, and return a
//! grouped result; asking for more rows than a group has yields the whole group.

use crate::error::{FrameError, FrameResult};
use crate::frame::Frame;
use crate::group::{GroupIndex, GroupedFrame};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::ops::Range;

/// One `arrange` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

impl From<&str> for SortKey {
    fn from(column: &str) -> Self {
        SortKey::asc(column)
    }
}

/// Compare for sorting; missing values go last in either direction.
pub(crate) fn cmp_directed(a: &Value, b: &Value, descending: bool) -> Ordering {
    if descending && !a.is_missing() && !b.is_missing() {
        b.total_cmp(a)
    } else {
        a.total_cmp(b)
    }
}

impl Frame {
    fn resolve_sort_keys(&self, keys: &[SortKey]) -> FrameResult<Vec<(usize, bool)>> {
        keys.iter()
            .map(|key| Ok((self.column_idx(&key.column)?, key.descending)))
            .collect()
    }

    /// Stable sort of `rows` by the resolved keys.
    fn sort_rows(&self, rows: &mut [usize], keys: &[(usize, bool)]) {
        rows.sort_by(|&a, &b| {
            keys.iter()
                .map(|&(col, descending)| {
                    let values = self.column_at(col).values();
                    cmp_directed(&values[a], &values[b], descending)
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(Ordering::Equal)
        });
    }

    fn sorted_positions(&self, keys: &[SortKey]) -> FrameResult<Vec<usize>> {
        let keys = self.resolve_sort_keys(keys)?;
        let mut rows: Vec<usize> = (0..self.len()).collect();
        self.sort_rows(&mut rows, &keys);
        Ok(rows)
    }

    fn pick_extreme(
        &self,
        rows: &[usize],
        column: usize,
        n: usize,
        descending: bool,
    ) -> Vec<usize> {
        let mut rows = rows.to_vec();
        self.sort_rows(&mut rows, &[(column, descending)]);
        rows.truncate(n);
        rows
    }

    /// Sort rows by one or more keys. The sort is stable and places missing values last.
    pub fn arrange(&self, keys: &[SortKey]) -> FrameResult<Frame> {
        Ok(self.take(&self.sorted_positions(keys)?))
    }

    /// Drop rows that repeat an earlier row on `columns` (all columns when empty). Every column
    /// is kept and the first occurrence wins.
    pub fn distinct<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        let cols: Vec<usize> = if columns.is_empty() {
            (0..self.width()).collect()
        } else {
            columns
                .iter()
                .map(|c| self.column_idx(c.as_ref()))
                .collect::<FrameResult<_>>()?
        };
        let mut seen: HashSet<Vec<&Value>> = HashSet::new();
        let keep: Vec<usize> = (0..self.len())
            .filter(|&row| {
                let key = cols
                    .iter()
                    .map(|&c| &self.column_at(c).values()[row])
                    .collect();
                seen.insert(key)
            })
            .collect();
        Ok(self.take(&keep))
    }

    /// Rows in `range`, clamped to the frame.
    pub fn slice(&self, range: Range<usize>) -> Frame {
        let rows: Vec<usize> = (0..self.len()).collect();
        self.take(&pick_range(&rows, range))
    }

    /// Rows at explicit positions, in the given order.
    pub fn slice_rows(&self, positions: &[usize]) -> FrameResult<Frame> {
        if let Some(&index) = positions.iter().find(|&&i| i >= self.len()) {
            return Err(FrameError::RowOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok(self.take(positions))
    }

    pub fn head(&self, n: usize) -> Frame {
        self.slice(0..n)
    }

    pub fn tail(&self, n: usize) -> Frame {
        self.slice(self.len().saturating_sub(n)..self.len())
    }

    /// The `n` rows with the smallest values of `column`, smallest first.
    pub fn slice_min(&self, column: &str, n: usize) -> FrameResult<Frame> {
        let col = self.column_idx(column)?;
        let rows: Vec<usize> = (0..self.len()).collect();
        Ok(self.take(&self.pick_extreme(&rows, col, n, false)))
    }

    /// The `n` rows with the largest values of `column`, largest first.
    pub fn slice_max(&self, column: &str, n: usize) -> FrameResult<Frame> {
        let col = self.column_idx(column)?;
        let rows: Vec<usize> = (0..self.len()).collect();
        Ok(self.take(&self.pick_extreme(&rows, col, n, true)))
    }

    pub fn extract(&self, column: &str) -> FrameResult<Vec<Value>> {
        Ok(self.column(column)?.to_vec())
    }

    pub fn extract_head(&self, column: &str, n: usize) -> FrameResult<Vec<Value>> {
        let values = self.column(column)?.values();
        Ok(values[..n.min(values.len())].to_vec())
    }

    pub fn extract_tail(&self, column: &str, n: usize) -> FrameResult<Vec<Value>> {
        let values = self.column(column)?.values();
        Ok(values[values.len().saturating_sub(n)..].to_vec())
    }

    pub fn extract_nth(&self, column: &str, index: usize) -> FrameResult<Value> {
        let column = self.column(column)?;
        column.get(index).cloned().ok_or(FrameError::RowOutOfBounds {
            index,
            len: column.len(),
        })
    }

    /// The `column` value of the row ranked `rank` (1-based) when sorted by `key`.
    ///
    /// Missing sort values rank last. `None` when `rank` is 0 or past the last row.
    pub fn extract_nth_where_sorted(
        &self,
        column: &str,
        key: &SortKey,
        rank: usize,
    ) -> FrameResult<Option<Value>> {
        let values = self.column(column)?.values();
        let order = self.sorted_positions(std::slice::from_ref(key))?;
        Ok(rank
            .checked_sub(1)
            .and_then(|i| order.get(i))
            .map(|&row| values[row].clone()))
    }

    /// Distinct values of `column` in first-seen order.
    pub fn extract_unique(&self, column: &str) -> FrameResult<Vec<Value>> {
        let mut seen = HashSet::new();
        Ok(self
            .column(column)?
            .iter()
            .filter(|v| seen.insert(*v))
            .cloned()
            .collect())
    }
}

fn pick_range(rows: &[usize], range: Range<usize>) -> Vec<usize> {
    let end = range.end.min(rows.len());
    let start = range.start.min(end);
    rows[start..end].to_vec()
}

impl GroupedFrame {
    fn slice_groups(&self, pick: impl Fn(&[usize]) -> Vec<usize>) -> GroupedFrame {
        let mut taken = Vec::new();
        let mut blocks = Vec::with_capacity(self.index.len());
        for group in self.index.groups() {
            let rows = pick(group.rows());
            blocks.push((group.key().to_vec(), rows.len()));
            taken.extend(rows);
        }
        let index = GroupIndex::contiguous(self.index.keys().to_vec(), blocks);
        GroupedFrame::new(self.frame.take(&taken), index)
    }

    /// Sort all rows (across groups); the Group Index follows the rows.
    pub fn arrange(&self, keys: &[SortKey]) -> FrameResult<GroupedFrame> {
        let order = self.frame.sorted_positions(keys)?;
        let mut new_position = vec![None; order.len()];
        for (new, &old) in order.iter().enumerate() {
            new_position[old] = Some(new);
        }
        Ok(GroupedFrame::new(
            self.frame.take(&order),
            self.index.remap(&new_position),
        ))
    }

    pub fn head(&self, n: usize) -> GroupedFrame {
        self.slice(0..n)
    }

    pub fn tail(&self, n: usize) -> GroupedFrame {
        self.slice_groups(|rows| rows[rows.len().saturating_sub(n)..].to_vec())
    }

    /// Positions within each group.
    pub fn slice(&self, range: Range<usize>) -> GroupedFrame {
        self.slice_groups(|rows| pick_range(rows, range.clone()))
    }

    pub fn slice_min(&self, column: &str, n: usize) -> FrameResult<GroupedFrame> {
        let col = self.frame.column_idx(column)?;
        Ok(self.slice_groups(|rows| self.frame.pick_extreme(rows, col, n, false)))
    }

    pub fn slice_max(&self, column: &str, n: usize) -> FrameResult<GroupedFrame> {
        let col = self.frame.column_idx(column)?;
        Ok(self.slice_groups(|rows| self.frame.pick_extreme(rows, col, n, true)))
    }
}
