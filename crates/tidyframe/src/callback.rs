use crate::error::{CallbackResult, FrameError, FrameResult};
use crate::frame::{Frame, Row};
use crate::group::GroupIndex;
use crate::scheduler::run_ordered;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Synchronous row callback: `(row, index, frame)`, where `row` is `frame.row(index)`.
pub type SyncRowFn<T> = dyn Fn(Row<'_>, usize, &Frame) -> CallbackResult<T> + Send + Sync;

/// Asynchronous row callback: `(index, frame)`. The frame is an owned (cheap) clone so the future
/// can hold it across await points; read the row with `frame.row(index)`.
pub type AsyncRowFn<T> =
    dyn Fn(usize, Frame) -> BoxFuture<'static, CallbackResult<T>> + Send + Sync;

/// A per-row function supplied by the host.
///
/// On an ungrouped frame `index` is the row position and `frame` the whole frame. On a grouped
/// frame `index` is the position within the group and `frame` is the group's rows.
pub enum RowFn<T> {
    Sync(Arc<SyncRowFn<T>>),
    Async(Arc<AsyncRowFn<T>>),
}

impl<T> Clone for RowFn<T> {
    fn clone(&self) -> Self {
        match self {
            RowFn::Sync(f) => RowFn::Sync(f.clone()),
            RowFn::Async(f) => RowFn::Async(f.clone()),
        }
    }
}

impl<T> std::fmt::Debug for RowFn<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowFn::Sync(_) => f.write_str("RowFn::Sync"),
            RowFn::Async(_) => f.write_str("RowFn::Async"),
        }
    }
}

impl<T: Send + 'static> RowFn<T> {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Row<'_>, usize, &Frame) -> CallbackResult<T> + Send + Sync + 'static,
    {
        RowFn::Sync(Arc::new(f))
    }

    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(usize, Frame) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallbackResult<T>> + Send + 'static,
    {
        RowFn::Async(Arc::new(move |index, frame| {
            Box::pin(f(index, frame)) as BoxFuture<'static, CallbackResult<T>>
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, RowFn::Async(_))
    }
}

/// The frames row callbacks see, and where each output position comes from.
///
/// Ungrouped: one frame, position `i` is row `i`. Grouped: one frame per group, position `i` is
/// the `j`-th row of group `g`.
pub(crate) struct RowScope {
    frames: Vec<Frame>,
    targets: Vec<(usize, usize)>,
}

impl RowScope {
    pub(crate) fn whole(frame: &Frame) -> Self {
        Self {
            frames: vec![frame.clone()],
            targets: (0..frame.len()).map(|i| (0, i)).collect(),
        }
    }

    pub(crate) fn grouped(frame: &Frame, index: &GroupIndex) -> Self {
        let mut targets = vec![(0, 0); frame.len()];
        let mut frames = Vec::with_capacity(index.len());
        for (g, group) in index.groups().iter().enumerate() {
            for (j, &row) in group.rows().iter().enumerate() {
                targets[row] = (g, j);
            }
            frames.push(frame.take(group.rows()));
        }
        Self { frames, targets }
    }

    pub(crate) fn len(&self) -> usize {
        self.targets.len()
    }

    pub(crate) fn eval_sync<T>(&self, f: &SyncRowFn<T>, verb: &'static str) -> FrameResult<Vec<T>> {
        self.targets
            .iter()
            .enumerate()
            .map(|(position, &(g, j))| {
                let frame = &self.frames[g];
                f(Row::new(frame, j), j, frame)
                    .map_err(|err| FrameError::callback(verb, position, err))
            })
            .collect()
    }

    /// Evaluate `f` at every position, through the bounded scheduler when it is async.
    pub(crate) async fn eval<T: Send + 'static>(
        &self,
        f: &RowFn<T>,
        limit: NonZeroUsize,
        verb: &'static str,
    ) -> FrameResult<Vec<T>> {
        match f {
            RowFn::Sync(f) => self.eval_sync(f.as_ref(), verb),
            RowFn::Async(f) => run_ordered(self.len(), limit, |position| {
                let (g, j) = self.targets[position];
                f(j, self.frames[g].clone())
            })
            .await
            .map_err(|(position, err)| FrameError::callback(verb, position, err)),
        }
    }
}
