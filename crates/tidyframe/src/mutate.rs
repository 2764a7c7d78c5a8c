//! Row derivation (`mutate`), row selection (`filter`) and whole-column `window` derivation.
//!
//! Every callback of one call sees the pre-call frame; results are committed together once all
//! of them have run. The first callback failure aborts the call and nothing is returned but the
//! error.

use crate::callback::{RowFn, RowScope};
use crate::column::Column;
use crate::error::{CallbackResult, FrameError, FrameResult};
use crate::frame::{Frame, Row};
use crate::group::GroupedFrame;
use crate::value::Value;
use std::num::NonZeroUsize;

/// A set of columns to derive in one `mutate` call.
#[derive(Clone, Debug, Default)]
pub struct Mutation {
    columns: Vec<(String, RowFn<Value>)>,
    concurrency: Option<NonZeroUsize>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive (or overwrite) `name` with `f`. Columns are committed in the order added.
    pub fn column(mut self, name: impl Into<String>, f: RowFn<Value>) -> Self {
        self.columns.push((name.into(), f));
        self
    }

    /// Shorthand for a synchronous column.
    pub fn with<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Row<'_>, usize, &Frame) -> CallbackResult<Value> + Send + Sync + 'static,
    {
        self.column(name, RowFn::sync(f))
    }

    /// Override the frame's concurrency limit for this call.
    pub fn concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    pub fn is_async(&self) -> bool {
        self.columns.iter().any(|(_, f)| f.is_async())
    }

    fn limit(&self, frame: &Frame) -> NonZeroUsize {
        self.concurrency.unwrap_or(frame.options().concurrency)
    }

    fn reject_async(&self, verb: &'static str) -> FrameResult<()> {
        match self.columns.iter().find(|(_, f)| f.is_async()) {
            Some((name, _)) => Err(FrameError::AsyncCallback {
                verb,
                column: name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn eval_sync(&self, scope: &RowScope) -> FrameResult<Vec<(String, Vec<Value>)>> {
        let mut out = Vec::with_capacity(self.columns.len());
        for (name, f) in &self.columns {
            let RowFn::Sync(f) = f else {
                return Err(FrameError::AsyncCallback {
                    verb: "mutate",
                    column: name.clone(),
                });
            };
            out.push((name.clone(), scope.eval_sync(f.as_ref(), "mutate")?));
        }
        Ok(out)
    }

    async fn eval(
        &self,
        scope: &RowScope,
        limit: NonZeroUsize,
    ) -> FrameResult<Vec<(String, Vec<Value>)>> {
        let mut out = Vec::with_capacity(self.columns.len());
        for (name, f) in &self.columns {
            out.push((name.clone(), scope.eval(f, limit, "mutate").await?));
        }
        Ok(out)
    }
}

fn commit(frame: &Frame, derived: Vec<(String, Vec<Value>)>) -> FrameResult<Frame> {
    let mut out = frame.clone();
    for (name, values) in derived {
        out = out.with_column(name, Column::new(values))?;
    }
    Ok(out)
}

fn keep_positions(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|(_, keep)| **keep)
        .map(|(i, _)| i)
        .collect()
}

impl Frame {
    /// Derive columns with synchronous callbacks.
    ///
    /// Fails with [`FrameError::AsyncCallback`] if any callback is async; use
    /// [`Frame::mutate_async`] for those.
    pub fn mutate(&self, mutation: &Mutation) -> FrameResult<Frame> {
        mutation.reject_async("mutate")?;
        let derived = mutation.eval_sync(&RowScope::whole(self))?;
        commit(self, derived)
    }

    /// Derive columns with any mix of sync and async callbacks. Async callbacks run through the
    /// bounded scheduler; output rows keep input order.
    pub async fn mutate_async(&self, mutation: &Mutation) -> FrameResult<Frame> {
        let limit = mutation.limit(self);
        let derived = mutation.eval(&RowScope::whole(self), limit).await?;
        commit(self, derived)
    }

    /// Keep rows for which `predicate` returns true, in their original order.
    pub fn filter<F>(&self, predicate: F) -> FrameResult<Frame>
    where
        F: Fn(Row<'_>, usize, &Frame) -> CallbackResult<bool>,
    {
        let mut keep = Vec::new();
        for row in self.rows() {
            let index = row.index();
            let keep_row = predicate(row, index, self)
                .map_err(|err| FrameError::callback("filter", index, err))?;
            if keep_row {
                keep.push(index);
            }
        }
        Ok(self.take(&keep))
    }

    /// `filter` with a sync or async predicate; `concurrency` overrides the frame's limit.
    pub async fn filter_async(
        &self,
        predicate: &RowFn<bool>,
        concurrency: Option<NonZeroUsize>,
    ) -> FrameResult<Frame> {
        let limit = concurrency.unwrap_or(self.options().concurrency);
        let mask = RowScope::whole(self).eval(predicate, limit, "filter").await?;
        Ok(self.take(&keep_positions(&mask)))
    }

    /// Derive a column from the whole frame at once, e.g. with the window functions.
    pub fn window<F>(&self, name: impl Into<String>, f: F) -> FrameResult<Frame>
    where
        F: Fn(&Frame) -> CallbackResult<Vec<Value>>,
    {
        let name = name.into();
        let values = f(self).map_err(|err| FrameError::callback("window", 0, err))?;
        self.with_column(name, Column::new(values))
    }
}

impl GroupedFrame {
    pub(crate) fn after_mutate(
        &self,
        frame: Frame,
        touched: &[String],
    ) -> FrameResult<GroupedFrame> {
        let keys = self.group_keys();
        if touched.iter().any(|name| keys.contains(name)) {
            return GroupedFrame::regroup(frame, keys);
        }
        Ok(GroupedFrame {
            frame,
            index: self.index.clone(),
        })
    }

    fn names_of(mutation: &Mutation) -> Vec<String> {
        mutation.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Grouped `mutate`: callbacks receive the within-group position and the group's rows.
    ///
    /// Overwriting a grouping column rebuilds the Group Index from the new values.
    pub fn mutate(&self, mutation: &Mutation) -> FrameResult<GroupedFrame> {
        mutation.reject_async("mutate")?;
        let scope = RowScope::grouped(&self.frame, &self.index);
        let derived = mutation.eval_sync(&scope)?;
        let frame = commit(&self.frame, derived)?;
        self.after_mutate(frame, &Self::names_of(mutation))
    }

    pub async fn mutate_async(&self, mutation: &Mutation) -> FrameResult<GroupedFrame> {
        let limit = mutation.limit(&self.frame);
        let scope = RowScope::grouped(&self.frame, &self.index);
        let derived = mutation.eval(&scope, limit).await?;
        let frame = commit(&self.frame, derived)?;
        self.after_mutate(frame, &Self::names_of(mutation))
    }

    /// Grouped `filter`: the predicate sees the group's rows; groups left empty are dropped and
    /// the surviving groups keep their order.
    pub fn filter<F>(&self, predicate: F) -> FrameResult<GroupedFrame>
    where
        F: Fn(Row<'_>, usize, &Frame) -> CallbackResult<bool> + Send + Sync + 'static,
    {
        let scope = RowScope::grouped(&self.frame, &self.index);
        let mask = scope.eval_sync(&predicate, "filter")?;
        Ok(self.keep_rows(&mask))
    }

    pub async fn filter_async(
        &self,
        predicate: &RowFn<bool>,
        concurrency: Option<NonZeroUsize>,
    ) -> FrameResult<GroupedFrame> {
        let limit = concurrency.unwrap_or(self.frame.options().concurrency);
        let scope = RowScope::grouped(&self.frame, &self.index);
        let mask = scope.eval(predicate, limit, "filter").await?;
        Ok(self.keep_rows(&mask))
    }

    fn keep_rows(&self, mask: &[bool]) -> GroupedFrame {
        let keep = keep_positions(mask);
        let mut new_position = vec![None; mask.len()];
        for (new, &old) in keep.iter().enumerate() {
            new_position[old] = Some(new);
        }
        GroupedFrame::new(self.frame.take(&keep), self.index.remap(&new_position))
    }

    /// Grouped `window`: `f` runs once per group and must return one value per group row.
    pub fn window<F>(&self, name: impl Into<String>, f: F) -> FrameResult<GroupedFrame>
    where
        F: Fn(&Frame) -> CallbackResult<Vec<Value>>,
    {
        let name = name.into();
        let mut values = vec![Value::Absent; self.frame.len()];
        for (g, group) in self.index.groups().iter().enumerate() {
            let sub = self.frame.take(group.rows());
            let out = f(&sub).map_err(|err| FrameError::callback("window", g, err))?;
            if out.len() != group.len() {
                return Err(FrameError::ColumnLengthMismatch {
                    column: name,
                    expected: group.len(),
                    actual: out.len(),
                });
            }
            for (&row, value) in group.rows().iter().zip(out) {
                values[row] = value;
            }
        }
        let frame = self.frame.with_column(name.clone(), Column::new(values))?;
        self.after_mutate(frame, &[name])
    }
}
