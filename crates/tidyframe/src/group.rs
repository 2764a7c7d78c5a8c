//! Group Index: an ordered partition of a frame's rows by composite key.
//!
//! Groups appear in the order their key was first seen while scanning rows, not in sorted order.
//! Keys compare by value, so every `Null`-keyed row lands in one group (and every `Absent`-keyed
//! row in another).
//!
//! A [`GroupIndex`] only ever travels inside a [`GroupedFrame`] next to the frame it was built
//! from. Grouped verbs either hand back a `GroupedFrame` with a recomputed index or a plain
//! [`Frame`].

use crate::error::{FrameError, FrameResult};
use crate::frame::Frame;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    key: Vec<Value>,
    rows: Vec<usize>,
}

impl Group {
    /// Values of the grouping columns, in grouping-column order.
    pub fn key(&self) -> &[Value] {
        &self.key
    }

    /// Row positions in the owning frame, ascending.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupIndex {
    keys: Vec<String>,
    groups: Vec<Group>,
}

impl GroupIndex {
    pub fn build<S: AsRef<str>>(frame: &Frame, keys: &[S]) -> FrameResult<Self> {
        if keys.is_empty() {
            return Err(FrameError::InvalidArgument(
                "group_by needs at least one column".to_string(),
            ));
        }
        let columns = keys
            .iter()
            .map(|k| frame.column(k.as_ref()))
            .collect::<FrameResult<Vec<_>>>()?;

        let mut seen: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        for row in 0..frame.len() {
            let key: Vec<Value> = columns.iter().map(|c| c.values()[row].clone()).collect();
            match seen.get(&key) {
                Some(&g) => groups[g].rows.push(row),
                None => {
                    seen.insert(key.clone(), groups.len());
                    groups.push(Group {
                        key,
                        rows: vec![row],
                    });
                }
            }
        }

        Ok(Self {
            keys: keys.iter().map(|k| k.as_ref().to_string()).collect(),
            groups,
        })
    }

    /// Index for output laid out group after group, `sizes[i]` rows for the i-th key.
    pub(crate) fn contiguous(keys: Vec<String>, blocks: Vec<(Vec<Value>, usize)>) -> Self {
        let mut offset = 0;
        let groups = blocks
            .into_iter()
            .filter(|(_, size)| *size > 0)
            .map(|(key, size)| {
                let rows = (offset..offset + size).collect();
                offset += size;
                Group { key, rows }
            })
            .collect();
        Self { keys, groups }
    }

    /// Carry the index over to a frame whose rows moved: `new_position[old]` is where an old
    /// row now lives, or `None` if it was removed. Group order is kept; emptied groups are
    /// dropped.
    pub(crate) fn remap(&self, new_position: &[Option<usize>]) -> Self {
        let groups = self
            .groups
            .iter()
            .filter_map(|group| {
                let mut rows: Vec<usize> = group
                    .rows
                    .iter()
                    .filter_map(|&row| new_position[row])
                    .collect();
                if rows.is_empty() {
                    return None;
                }
                rows.sort_unstable();
                Some(Group {
                    key: group.key.clone(),
                    rows,
                })
            })
            .collect();
        Self {
            keys: self.keys.clone(),
            groups,
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A frame together with the Group Index computed from it.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupedFrame {
    pub(crate) frame: Frame,
    pub(crate) index: Arc<GroupIndex>,
}

impl Frame {
    /// Partition rows by the given columns, in first-seen key order.
    pub fn group_by<S: AsRef<str>>(&self, keys: &[S]) -> FrameResult<GroupedFrame> {
        let index = GroupIndex::build(self, keys)?;
        Ok(GroupedFrame {
            frame: self.clone(),
            index: Arc::new(index),
        })
    }
}

impl GroupedFrame {
    pub(crate) fn new(frame: Frame, index: GroupIndex) -> Self {
        Self {
            frame,
            index: Arc::new(index),
        }
    }

    /// Rebuild the index from the current key values, e.g. after a key column was overwritten.
    pub(crate) fn regroup(frame: Frame, keys: &[String]) -> FrameResult<Self> {
        let index = GroupIndex::build(&frame, keys)?;
        log::debug!(
            "regrouped {} rows by {:?} into {} groups",
            frame.len(),
            keys,
            index.len()
        );
        Ok(Self::new(frame, index))
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn index(&self) -> &GroupIndex {
        &self.index
    }

    pub fn group_keys(&self) -> &[String] {
        self.index.keys()
    }

    pub fn n_groups(&self) -> usize {
        self.index.len()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Drop the Group Index; rows are unchanged.
    pub fn ungroup(&self) -> Frame {
        self.frame.clone()
    }

    /// Each group's key together with a frame of its rows.
    pub fn groups(&self) -> impl Iterator<Item = (&[Value], Frame)> + '_ {
        self.index
            .groups()
            .iter()
            .map(|group| (group.key(), self.frame.take(group.rows())))
    }
}
