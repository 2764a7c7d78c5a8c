use crate::column::Column;
use crate::error::{CallbackResult, FrameError, FrameResult};
use crate::frame::Frame;
use crate::group::GroupedFrame;
use crate::value::Value;
use std::sync::Arc;

pub type AggregateFn = dyn Fn(&Frame) -> CallbackResult<Value> + Send + Sync;

/// Named aggregations for `summarise`; each is called with the rows of one group.
#[derive(Clone, Default)]
pub struct Summary {
    aggregations: Vec<(String, Arc<AggregateFn>)>,
}

impl std::fmt::Debug for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.aggregations.iter().map(|(name, _)| name))
            .finish()
    }
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agg<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Frame) -> CallbackResult<Value> + Send + Sync + 'static,
    {
        self.aggregations.push((name.into(), Arc::new(f)));
        self
    }

    /// One output row per input frame, in order.
    fn run(&self, parts: &[Frame], template: &Frame) -> FrameResult<Frame> {
        let mut names = Vec::with_capacity(self.aggregations.len());
        let mut columns = Vec::with_capacity(self.aggregations.len());
        for (name, f) in &self.aggregations {
            let values = parts
                .iter()
                .enumerate()
                .map(|(position, part)| {
                    f(part).map_err(|err| FrameError::callback("summarise", position, err))
                })
                .collect::<FrameResult<Vec<_>>>()?;
            names.push(name.clone());
            columns.push(Column::new(values));
        }
        template.derive(names, columns, parts.len())
    }
}

impl Frame {
    /// Collapse the whole frame to a single row.
    pub fn summarise(&self, summary: &Summary) -> FrameResult<Frame> {
        summary.run(std::slice::from_ref(self), self)
    }

    /// Number of rows per distinct combination of `columns`, keys first, count in `n`.
    pub fn count<S: AsRef<str>>(&self, columns: &[S]) -> FrameResult<Frame> {
        self.group_by(columns)?.count()
    }
}

impl GroupedFrame {
    /// One row per group, in group order. Grouping columns are not carried over; re-derive
    /// them with an aggregation if needed.
    pub fn summarise(&self, summary: &Summary) -> FrameResult<Frame> {
        let parts: Vec<Frame> = self.groups().map(|(_, frame)| frame).collect();
        let out = summary.run(&parts, &self.frame)?;
        log::debug!(
            "summarised {} rows into {} groups",
            self.frame.len(),
            out.len()
        );
        Ok(out)
    }

    /// Group keys followed by the group size in `n`.
    pub fn count(&self) -> FrameResult<Frame> {
        let keys = self.group_keys();
        let groups = self.index.groups();
        let mut names: Vec<String> = keys.to_vec();
        let mut columns: Vec<Column> = (0..keys.len())
            .map(|k| Column::new(groups.iter().map(|g| g.key()[k].clone()).collect()))
            .collect();
        names.push("n".to_string());
        columns.push(groups.iter().map(|g| g.len()).collect());
        self.frame.derive(names, columns, groups.len())
    }
}
