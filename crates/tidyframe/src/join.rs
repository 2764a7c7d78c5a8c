//! Equality joins.
//!
//! Output layout: every left column (key columns first-class, never suffixed), then the right
//! side's non-key columns. Duplicate keys on both sides expand to the Cartesian product of the
//! matching rows. Rows missing on the non-preserved side get [`Value::Absent`], and those
//! columns are marked optional for the whole output, whether or not any row actually went
//! unmatched.

use crate::column::Column;
use crate::error::{FrameError, FrameResult};
use crate::frame::Frame;
use crate::value::Value;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    fn keeps_unmatched_left(self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Outer)
    }

    fn keeps_unmatched_right(self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Outer)
    }
}

/// Key columns of a join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinKeys {
    /// Same column names on both sides.
    Same(Vec<String>),
    /// Parallel lists when names differ between sides.
    Mapped { left: Vec<String>, right: Vec<String> },
}

impl JoinKeys {
    pub fn mapped<A: AsRef<str>, B: AsRef<str>>(left: &[A], right: &[B]) -> Self {
        JoinKeys::Mapped {
            left: left.iter().map(|s| s.as_ref().to_string()).collect(),
            right: right.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Column index pairs `(left, right)`.
    pub(crate) fn resolve(&self, left: &Frame, right: &Frame) -> FrameResult<Vec<(usize, usize)>> {
        let (l, r) = match self {
            JoinKeys::Same(keys) => (keys, keys),
            JoinKeys::Mapped { left, right } => (left, right),
        };
        if l.is_empty() {
            return Err(FrameError::InvalidJoinKeys(
                "at least one key column is required".to_string(),
            ));
        }
        if l.len() != r.len() {
            return Err(FrameError::InvalidJoinKeys(format!(
                "{} left key columns but {} right key columns",
                l.len(),
                r.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in l {
            if !seen.insert(name) {
                return Err(FrameError::InvalidJoinKeys(format!(
                    "key column {name} listed twice"
                )));
            }
        }
        l.iter()
            .zip(r)
            .map(|(a, b)| Ok((left.column_idx(a)?, right.column_idx(b)?)))
            .collect()
    }
}

impl From<&str> for JoinKeys {
    fn from(key: &str) -> Self {
        JoinKeys::Same(vec![key.to_string()])
    }
}

impl From<String> for JoinKeys {
    fn from(key: String) -> Self {
        JoinKeys::Same(vec![key])
    }
}

impl From<Vec<&str>> for JoinKeys {
    fn from(keys: Vec<&str>) -> Self {
        JoinKeys::Same(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for JoinKeys {
    fn from(keys: Vec<String>) -> Self {
        JoinKeys::Same(keys)
    }
}

impl From<(&str, &str)> for JoinKeys {
    fn from((left, right): (&str, &str)) -> Self {
        JoinKeys::mapped(&[left], &[right])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinOptions {
    /// Appended to colliding non-key column names, `(left, right)`.
    pub suffixes: (String, String),
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            suffixes: (String::new(), "_y".to_string()),
        }
    }
}

/// Assembles join output from matched row pairs.
pub(crate) struct Combine<'a> {
    pub(crate) left: &'a Frame,
    pub(crate) right: &'a Frame,
    pub(crate) left_rows: Vec<Option<usize>>,
    pub(crate) right_rows: Vec<Option<usize>>,
    /// Coalesced key columns `(left, right)`; only the left copy appears in the output.
    pub(crate) keys: Vec<(usize, usize)>,
    /// Right columns left out of the output besides the key columns.
    pub(crate) right_skip: Vec<usize>,
    pub(crate) left_optional: bool,
    pub(crate) right_optional: bool,
    pub(crate) suffixes: &'a (String, String),
}

impl Combine<'_> {
    pub(crate) fn build(self) -> FrameResult<Frame> {
        let left_keys: HashMap<usize, usize> = self.keys.iter().copied().collect();
        let right_out: Vec<usize> = (0..self.right.width())
            .filter(|c| !self.right_skip.contains(c) && !self.keys.iter().any(|k| k.1 == *c))
            .collect();
        let right_names: HashSet<&str> = right_out
            .iter()
            .map(|&c| self.right.names()[c].as_str())
            .collect();
        let (left_suffix, right_suffix) = self.suffixes;

        let len = self.left_rows.len();
        let mut names = Vec::with_capacity(self.left.width() + right_out.len());
        let mut columns = Vec::with_capacity(names.capacity());

        for (c, (name, column)) in self.left.columns().enumerate() {
            if let Some(&rc) = left_keys.get(&c) {
                let right_col = self.right.column_at(rc);
                let values = self
                    .left_rows
                    .iter()
                    .zip(&self.right_rows)
                    .map(|(l, r)| match (l, r) {
                        (Some(l), _) => column.values()[*l].clone(),
                        (None, Some(r)) => right_col.values()[*r].clone(),
                        (None, None) => Value::Absent,
                    })
                    .collect();
                names.push(name.to_string());
                columns.push(Column::new(values).with_optional(column.is_optional()));
                continue;
            }
            let name = if right_names.contains(name) {
                format!("{name}{left_suffix}")
            } else {
                name.to_string()
            };
            names.push(name);
            columns.push(column.take_or_absent(&self.left_rows, self.left_optional));
        }

        for c in right_out {
            let name = &self.right.names()[c];
            let name = if self.left.has_column(name) {
                format!("{name}{right_suffix}")
            } else {
                name.clone()
            };
            names.push(name);
            columns.push(
                self.right
                    .column_at(c)
                    .take_or_absent(&self.right_rows, self.right_optional),
            );
        }

        self.left.derive(names, columns, len)
    }
}

impl Frame {
    /// Equality join on `keys`.
    pub fn join(
        &self,
        right: &Frame,
        keys: impl Into<JoinKeys>,
        kind: JoinKind,
        options: &JoinOptions,
    ) -> FrameResult<Frame> {
        let keys = keys.into().resolve(self, right)?;

        let mut lookup: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
        for row in 0..right.len() {
            let key = keys
                .iter()
                .map(|&(_, rc)| &right.column_at(rc).values()[row])
                .collect();
            lookup.entry(key).or_default().push(row);
        }

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        let mut right_matched = vec![false; right.len()];
        for row in 0..self.len() {
            let key: Vec<&Value> = keys
                .iter()
                .map(|&(lc, _)| &self.column_at(lc).values()[row])
                .collect();
            match lookup.get(&key) {
                Some(matches) => {
                    for &r in matches {
                        left_rows.push(Some(row));
                        right_rows.push(Some(r));
                        right_matched[r] = true;
                    }
                }
                None if kind.keeps_unmatched_left() => {
                    left_rows.push(Some(row));
                    right_rows.push(None);
                }
                None => {}
            }
        }
        if kind.keeps_unmatched_right() {
            for (r, matched) in right_matched.iter().enumerate() {
                if !matched {
                    left_rows.push(None);
                    right_rows.push(Some(r));
                }
            }
        }

        log::debug!(
            "{kind:?} join of {} x {} rows produced {} rows",
            self.len(),
            right.len(),
            left_rows.len()
        );

        Combine {
            left: self,
            right,
            left_rows,
            right_rows,
            keys,
            right_skip: Vec::new(),
            left_optional: kind.keeps_unmatched_right(),
            right_optional: kind.keeps_unmatched_left(),
            suffixes: &options.suffixes,
        }
        .build()
    }

    pub fn inner_join(&self, right: &Frame, keys: impl Into<JoinKeys>) -> FrameResult<Frame> {
        self.join(right, keys, JoinKind::Inner, &JoinOptions::default())
    }

    pub fn left_join(&self, right: &Frame, keys: impl Into<JoinKeys>) -> FrameResult<Frame> {
        self.join(right, keys, JoinKind::Left, &JoinOptions::default())
    }

    pub fn right_join(&self, right: &Frame, keys: impl Into<JoinKeys>) -> FrameResult<Frame> {
        self.join(right, keys, JoinKind::Right, &JoinOptions::default())
    }

    pub fn outer_join(&self, right: &Frame, keys: impl Into<JoinKeys>) -> FrameResult<Frame> {
        self.join(right, keys, JoinKind::Outer, &JoinOptions::default())
    }

    /// Every left row paired with every right row, left-major.
    pub fn cross_join(&self, right: &Frame, options: &JoinOptions) -> FrameResult<Frame> {
        let mut left_rows = Vec::with_capacity(self.len() * right.len());
        let mut right_rows = Vec::with_capacity(left_rows.capacity());
        for l in 0..self.len() {
            for r in 0..right.len() {
                left_rows.push(Some(l));
                right_rows.push(Some(r));
            }
        }
        Combine {
            left: self,
            right,
            left_rows,
            right_rows,
            keys: Vec::new(),
            right_skip: Vec::new(),
            left_optional: false,
            right_optional: false,
            suffixes: &options.suffixes,
        }
        .build()
    }
}
