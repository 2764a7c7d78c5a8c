//! Nearest-match ("as of") join along an ordered key.
//!
//! Keys are numbers or date/times; date/times are measured in milliseconds, so a tolerance for a
//! date/time key is a number of milliseconds. A left row whose key is missing never matches.

use crate::error::{FrameError, FrameResult};
use crate::frame::Frame;
use crate::join::{Combine, JoinKeys};
use crate::value::{DataType, Value};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AsofDirection {
    /// Largest right key <= left key.
    #[default]
    Backward,
    /// Smallest right key >= left key.
    Forward,
    /// Smallest absolute distance; ties go to the earlier (smaller) key.
    Nearest,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AsofOptions {
    pub direction: AsofDirection,
    /// Maximum distance for a match, inclusive.
    pub tolerance: Option<f64>,
    /// Columns (present on both sides) that must match exactly.
    pub group_by: Vec<String>,
    pub suffixes: (String, String),
}

impl Default for AsofOptions {
    fn default() -> Self {
        Self {
            direction: AsofDirection::Backward,
            tolerance: None,
            group_by: Vec::new(),
            suffixes: (String::new(), "_y".to_string()),
        }
    }
}

impl AsofOptions {
    pub fn direction(mut self, direction: AsofDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn group_by<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.group_by = columns.iter().map(|c| c.as_ref().to_string()).collect();
        self
    }
}

/// Position of `value` on the key axis; `None` for missing keys (and NaN).
fn ordinal(value: &Value, column: &str) -> FrameResult<Option<f64>> {
    if value.is_na() {
        return Ok(None);
    }
    match value.as_ordinal() {
        Some(x) => Ok(Some(x)),
        None => Err(FrameError::UnorderableKey {
            column: column.to_string(),
            found: value.data_type().unwrap_or(DataType::Unknown),
        }),
    }
}

/// Right rows of one partition, sorted by key (stable).
struct Partition {
    keys: Vec<f64>,
    rows: Vec<usize>,
}

impl Partition {
    fn find(&self, x: f64, direction: AsofDirection) -> Option<(usize, f64)> {
        // keys[..upper] <= x, keys[..lower] < x
        let upper = self.keys.partition_point(|k| *k <= x);
        let lower = self.keys.partition_point(|k| *k < x);
        let backward = upper.checked_sub(1).map(|i| (i, x - self.keys[i]));
        let forward = (lower < self.keys.len()).then(|| (lower, self.keys[lower] - x));
        let (i, distance) = match direction {
            AsofDirection::Backward => backward?,
            AsofDirection::Forward => forward?,
            AsofDirection::Nearest => match (backward, forward) {
                (Some(b), Some(f)) if f.1 < b.1 => f,
                (Some(b), _) => b,
                (None, f) => f?,
            },
        };
        Some((self.rows[i], distance))
    }
}

impl Frame {
    /// Join each left row to the nearest right row along `on`.
    ///
    /// `on` names one key column (or a `(left, right)` pair). Right columns other than the key
    /// and the `group_by` columns are appended, optional, and [`Value::Absent`] where nothing
    /// matched within the tolerance.
    pub fn asof_join(
        &self,
        right: &Frame,
        on: impl Into<JoinKeys>,
        options: &AsofOptions,
    ) -> FrameResult<Frame> {
        let on = on.into().resolve(self, right)?;
        let [(left_on, right_on)] = on.as_slice() else {
            return Err(FrameError::InvalidJoinKeys(
                "asof join needs exactly one ordering key".to_string(),
            ));
        };
        if let Some(tolerance) = options.tolerance {
            if tolerance.is_nan() || tolerance < 0.0 {
                return Err(FrameError::InvalidArgument(format!(
                    "tolerance must be non-negative, got {tolerance}"
                )));
            }
        }

        let by = JoinKeys::Same(options.group_by.clone());
        let by = if options.group_by.is_empty() {
            Vec::new()
        } else {
            by.resolve(self, right)?
        };

        let right_name = &right.names()[*right_on];
        let right_keys = right.column_at(*right_on).values();
        let mut partitions: HashMap<Vec<&Value>, Vec<(f64, usize)>> = HashMap::new();
        for row in 0..right.len() {
            let Some(x) = ordinal(&right_keys[row], right_name)? else {
                continue;
            };
            let part = by
                .iter()
                .map(|&(_, rc)| &right.column_at(rc).values()[row])
                .collect();
            partitions.entry(part).or_default().push((x, row));
        }
        let partitions: HashMap<Vec<&Value>, Partition> = partitions
            .into_iter()
            .map(|(part, mut entries)| {
                entries.sort_by_key(|(x, _)| OrderedFloat(*x));
                let (keys, rows) = entries.into_iter().unzip();
                (part, Partition { keys, rows })
            })
            .collect();

        let left_name = &self.names()[*left_on];
        let left_keys = self.column_at(*left_on).values();
        let mut right_rows = Vec::with_capacity(self.len());
        for row in 0..self.len() {
            let matched = match ordinal(&left_keys[row], left_name)? {
                None => None,
                Some(x) => {
                    let part: Vec<&Value> = by
                        .iter()
                        .map(|&(lc, _)| &self.column_at(lc).values()[row])
                        .collect();
                    partitions
                        .get(&part)
                        .and_then(|p| p.find(x, options.direction))
                        .filter(|(_, distance)| {
                            options.tolerance.map_or(true, |tol| *distance <= tol)
                        })
                        .map(|(r, _)| r)
                }
            };
            right_rows.push(matched);
        }

        log::debug!(
            "asof join matched {} of {} left rows",
            right_rows.iter().filter(|r| r.is_some()).count(),
            self.len()
        );

        let mut right_skip = vec![*right_on];
        right_skip.extend(by.iter().map(|&(_, rc)| rc));
        Combine {
            left: self,
            right,
            left_rows: (0..self.len()).map(Some).collect(),
            right_rows,
            keys: Vec::new(),
            right_skip,
            left_optional: false,
            right_optional: true,
            suffixes: &options.suffixes,
        }
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use pretty_assertions::assert_eq;

    fn quotes() -> Frame {
        Frame::from_columns([
            ("t", Column::from_iter([3, 8])),
            ("price", Column::from_iter(["p3", "p8"])),
        ])
        .unwrap()
    }

    fn trades(ts: &[i64]) -> Frame {
        Frame::from_columns([("t", Column::from_iter(ts.iter().copied()))]).unwrap()
    }

    #[test]
    fn backward_picks_latest_not_after() {
        let out = trades(&[1, 3, 5, 9])
            .asof_join(&quotes(), "t", &AsofOptions::default())
            .unwrap();
        assert_eq!(
            out.extract("price").unwrap(),
            vec![Value::Absent, "p3".into(), "p3".into(), "p8".into()]
        );
        assert!(out.column("price").unwrap().is_optional());
        assert_eq!(out.names(), &["t", "price"]);
    }

    #[test]
    fn forward_and_nearest() {
        let forward = trades(&[5, 9])
            .asof_join(
                &quotes(),
                "t",
                &AsofOptions::default().direction(AsofDirection::Forward),
            )
            .unwrap();
        assert_eq!(
            forward.extract("price").unwrap(),
            vec!["p8".into(), Value::Absent]
        );

        // 5.5 is 2.5 from both 3 and 8: the earlier key wins
        let left = Frame::from_columns([("t", Column::from_iter([5.5, 7.0]))]).unwrap();
        let nearest = left
            .asof_join(
                &quotes(),
                "t",
                &AsofOptions::default().direction(AsofDirection::Nearest),
            )
            .unwrap();
        assert_eq!(
            nearest.extract("price").unwrap(),
            vec!["p3".into(), "p8".into()]
        );
    }

    #[test]
    fn tolerance_is_inclusive() {
        let opts = AsofOptions::default().tolerance(2.0);
        let out = trades(&[5, 6]).asof_join(&quotes(), "t", &opts).unwrap();
        assert_eq!(
            out.extract("price").unwrap(),
            vec!["p3".into(), Value::Absent]
        );
    }

    #[test]
    fn partitions_restrict_matches() {
        let right = Frame::from_columns([
            ("sym", Column::from_iter(["a", "b"])),
            ("t", Column::from_iter([1, 2])),
            ("px", Column::from_iter([10, 20])),
        ])
        .unwrap();
        let left = Frame::from_columns([
            ("sym", Column::from_iter(["a", "b", "c"])),
            ("t", Column::from_iter([5, 5, 5])),
        ])
        .unwrap();
        let out = left
            .asof_join(&right, "t", &AsofOptions::default().group_by(&["sym"]))
            .unwrap();
        assert_eq!(out.names(), &["sym", "t", "px"]);
        assert_eq!(
            out.extract("px").unwrap(),
            vec![Value::Int(10), Value::Int(20), Value::Absent]
        );
    }

    #[test]
    fn missing_left_keys_never_match_and_strings_are_rejected() {
        let left = Frame::from_columns([("t", Column::new(vec![Value::Null]))]).unwrap();
        let out = left.asof_join(&quotes(), "t", &AsofOptions::default()).unwrap();
        assert_eq!(out.extract("price").unwrap(), vec![Value::Absent]);

        let bad = Frame::from_columns([("t", Column::from_iter(["x"]))]).unwrap();
        assert!(matches!(
            bad.asof_join(&quotes(), "t", &AsofOptions::default()),
            Err(FrameError::UnorderableKey { .. })
        ));
    }

    #[test]
    fn datetime_keys_use_milliseconds() {
        let right = Frame::from_columns([
            ("t", Column::new(vec![Value::from_millis(1_000)])),
            ("v", Column::from_iter([1])),
        ])
        .unwrap();
        let left = Frame::from_columns([(
            "t",
            Column::new(vec![Value::from_millis(1_500), Value::from_millis(2_500)]),
        )])
        .unwrap();
        let out = left
            .asof_join(&right, "t", &AsofOptions::default().tolerance(1_000.0))
            .unwrap();
        assert_eq!(out.extract("v").unwrap(), vec![Value::Int(1), Value::Absent]);
    }
}
