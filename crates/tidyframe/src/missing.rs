//! Dropping and filling missing cells.
//!
//! `Null` and `Absent` are handled separately or together: `remove_null` only looks at nulls,
//! `remove_absent` only at absent cells and `remove_missing` at both. An empty column list
//! checks every column.

use crate::column::Column;
use crate::error::FrameResult;
use crate::frame::Frame;
use crate::group::GroupedFrame;
use crate::value::Value;

impl Frame {
    /// Drop rows holding [`Value::Null`] in any of `columns`.
    pub fn remove_null<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        self.remove_where(columns, Value::is_null)
    }

    /// Drop rows holding [`Value::Absent`] in any of `columns`.
    pub fn remove_absent<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        self.remove_where(columns, Value::is_absent)
    }

    /// Drop rows holding either kind of missing value in any of `columns`.
    pub fn remove_missing<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        self.remove_where(columns, Value::is_missing)
    }

    /// Replace null and absent cells of each named column with its replacement value.
    ///
    /// Other cells, and columns not named, are untouched. A column left without absent cells
    /// is no longer optional.
    pub fn replace_missing<S: AsRef<str>>(
        &self,
        replacements: &[(S, Value)],
    ) -> FrameResult<Frame> {
        let mut out = self.clone();
        for (name, with) in replacements {
            let name = name.as_ref();
            let values = self
                .column(name)?
                .iter()
                .map(|value| {
                    if value.is_missing() {
                        with.clone()
                    } else {
                        value.clone()
                    }
                })
                .collect();
            out = out.with_column(name, Column::new(values))?;
        }
        Ok(out)
    }

    fn missing_rows<S: AsRef<str>>(
        &self,
        columns: &[S],
        is_missing: fn(&Value) -> bool,
    ) -> FrameResult<Vec<usize>> {
        let checked: Vec<&Column> = if columns.is_empty() {
            self.columns().map(|(_, column)| column).collect()
        } else {
            columns
                .iter()
                .map(|name| self.column(name.as_ref()))
                .collect::<FrameResult<_>>()?
        };
        Ok((0..self.len())
            .filter(|&row| !checked.iter().any(|column| is_missing(&column.values()[row])))
            .collect())
    }

    fn remove_where<S: AsRef<str>>(
        &self,
        columns: &[S],
        is_missing: fn(&Value) -> bool,
    ) -> FrameResult<Frame> {
        let keep = self.missing_rows(columns, is_missing)?;
        Ok(self.take(&keep))
    }
}

impl GroupedFrame {
    pub fn remove_null<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<GroupedFrame> {
        self.remove_where(columns, Value::is_null)
    }

    pub fn remove_absent<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<GroupedFrame> {
        self.remove_where(columns, Value::is_absent)
    }

    pub fn remove_missing<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<GroupedFrame> {
        self.remove_where(columns, Value::is_missing)
    }

    fn remove_where<S: AsRef<str>>(
        &self,
        columns: &[S],
        is_missing: fn(&Value) -> bool,
    ) -> FrameResult<GroupedFrame> {
        let keep = self.frame.missing_rows(columns, is_missing)?;
        GroupedFrame::regroup(self.frame.take(&keep), self.group_keys())
    }
}
