//! Window and ranking functions over a single value sequence.
//!
//! These are plain functions over `&[Value]`; use them from [`Frame::window`] or
//! [`GroupedFrame::window`] to run them per frame or per group.
//!
//! [`Frame::window`]: crate::Frame::window
//! [`GroupedFrame::window`]: crate::GroupedFrame::window

use crate::error::{FrameError, FrameResult};
use crate::value::{DataType, Value};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// How tied values share ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TieMethod {
    /// Mean of the tied positions.
    #[default]
    Average,
    Min,
    Max,
    /// Consecutive ranks with no gaps between distinct values.
    Dense,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RankOptions {
    pub ties: TieMethod,
    pub descending: bool,
}

/// 1-based ranks. Missing values (and NaN) take no part and come out as [`Value::Absent`].
///
/// `Average` ranks are floats; the other methods give integers.
pub fn rank(values: &[Value], options: RankOptions) -> Vec<Value> {
    let mut order: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_na()).collect();
    order.sort_by(|&a, &b| {
        let ord = values[a].total_cmp(&values[b]);
        if options.descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let mut out = vec![Value::Absent; values.len()];
    let mut start = 0;
    let mut dense = 0i64;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len()
            && values[order[end]].total_cmp(&values[order[start]]) == Ordering::Equal
        {
            end += 1;
        }
        dense += 1;
        let rank = match options.ties {
            TieMethod::Average => Value::Float((start + 1 + end) as f64 / 2.0),
            TieMethod::Min => Value::Int(start as i64 + 1),
            TieMethod::Max => Value::Int(end as i64),
            TieMethod::Dense => Value::Int(dense),
        };
        for &i in &order[start..end] {
            out[i] = rank.clone();
        }
        start = end;
    }
    out
}

fn check_shift(k: i64) -> FrameResult<usize> {
    usize::try_from(k).map_err(|_| FrameError::NegativeShift(k))
}

/// Shift values `k` positions later; the first `k` positions take `default` (absent if `None`).
pub fn lag(values: &[Value], k: i64, default: Option<Value>) -> FrameResult<Vec<Value>> {
    let k = check_shift(k)?;
    let fill = default.unwrap_or(Value::Absent);
    let k = k.min(values.len());
    let mut out = vec![fill; k];
    out.extend_from_slice(&values[..values.len() - k]);
    Ok(out)
}

/// Shift values `k` positions earlier; the last `k` positions take `default` (absent if `None`).
pub fn lead(values: &[Value], k: i64, default: Option<Value>) -> FrameResult<Vec<Value>> {
    let k = check_shift(k)?;
    let fill = default.unwrap_or(Value::Absent);
    let k = k.min(values.len());
    let mut out = values[k..].to_vec();
    out.extend(std::iter::repeat(fill).take(k));
    Ok(out)
}

/// How cumulative folds treat missing and NaN inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FoldMode {
    /// A missing value makes every later position `Null`; a NaN makes them NaN.
    #[default]
    Propagate,
    /// Skip invalid inputs: their positions repeat the running result (`Null` before the first
    /// valid value).
    Remove,
}

fn numeric_input(value: &Value) -> FrameResult<f64> {
    value.as_f64().ok_or_else(|| {
        FrameError::InvalidArgument(format!("cumulative folds need numbers, got {value}"))
    })
}

/// Shared driver for the folds; results are floats.
fn cumulate(
    values: &[Value],
    mode: FoldMode,
    step: impl Fn(f64, f64) -> f64,
    finish: impl Fn(f64, usize) -> f64,
) -> FrameResult<Vec<Value>> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc: Option<f64> = None;
    let mut count = 0usize;
    let mut poisoned: Option<Value> = None;

    for value in values {
        if let Some(p) = &poisoned {
            out.push(p.clone());
            continue;
        }
        if value.is_missing() {
            match mode {
                FoldMode::Propagate => {
                    poisoned = Some(Value::Null);
                    out.push(Value::Null);
                }
                FoldMode::Remove => {
                    out.push(acc.map_or(Value::Null, |a| Value::Float(finish(a, count))))
                }
            }
            continue;
        }
        let x = numeric_input(value)?;
        if x.is_nan() {
            match mode {
                FoldMode::Propagate => {
                    poisoned = Some(Value::Float(f64::NAN));
                    out.push(Value::Float(f64::NAN));
                }
                FoldMode::Remove => {
                    out.push(acc.map_or(Value::Null, |a| Value::Float(finish(a, count))))
                }
            }
            continue;
        }
        count += 1;
        let next = match acc {
            None => x,
            Some(a) => step(a, x),
        };
        acc = Some(next);
        out.push(Value::Float(finish(next, count)));
    }
    Ok(out)
}

fn identity(acc: f64, _count: usize) -> f64 {
    acc
}

pub fn cumsum(values: &[Value], mode: FoldMode) -> FrameResult<Vec<Value>> {
    cumulate(values, mode, |a, x| a + x, identity)
}

pub fn cumprod(values: &[Value], mode: FoldMode) -> FrameResult<Vec<Value>> {
    cumulate(values, mode, |a, x| a * x, identity)
}

pub fn cummax(values: &[Value], mode: FoldMode) -> FrameResult<Vec<Value>> {
    cumulate(values, mode, f64::max, identity)
}

pub fn cummin(values: &[Value], mode: FoldMode) -> FrameResult<Vec<Value>> {
    cumulate(values, mode, f64::min, identity)
}

pub fn cummean(values: &[Value], mode: FoldMode) -> FrameResult<Vec<Value>> {
    cumulate(values, mode, |a, x| a + x, |sum, n| sum / n as f64)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InterpolationMethod {
    #[default]
    Linear,
    /// Natural cubic spline; linear when fewer than four valid points exist.
    Spline,
}

/// Fill interior missing values of `values`, positioned along `x` (numbers or date/times).
///
/// Only positions whose `x` lies between the smallest and largest valid `x` are filled;
/// leading and trailing gaps stay missing. Filled values are floats; other values pass through
/// unchanged.
pub fn interpolate(
    values: &[Value],
    x: &[Value],
    method: InterpolationMethod,
) -> FrameResult<Vec<Value>> {
    if values.len() != x.len() {
        return Err(FrameError::LengthMismatch {
            left: "values",
            left_len: values.len(),
            right: "x",
            right_len: x.len(),
        });
    }

    let mut xs: Vec<Option<f64>> = Vec::with_capacity(x.len());
    for value in x {
        if value.is_na() {
            xs.push(None);
            continue;
        }
        match value.as_ordinal() {
            Some(v) => xs.push(Some(v)),
            None => {
                return Err(FrameError::UnorderableKey {
                    column: "x".to_string(),
                    found: value.data_type().unwrap_or(DataType::Unknown),
                })
            }
        }
    }

    let mut points: Vec<(f64, f64)> = Vec::new();
    for (value, xi) in values.iter().zip(&xs) {
        if value.is_na() {
            continue;
        }
        let y = value.as_f64().ok_or_else(|| {
            FrameError::InvalidArgument(format!("interpolate needs numbers, got {value}"))
        })?;
        if let Some(xi) = xi {
            points.push((*xi, y));
        }
    }
    points.sort_by_key(|(px, _)| OrderedFloat(*px));
    points.dedup_by(|b, a| a.0 == b.0);

    let spline = match method {
        InterpolationMethod::Spline if points.len() >= 4 => Some(NaturalSpline::fit(&points)),
        _ => None,
    };

    let mut out = values.to_vec();
    for (slot, (value, xi)) in out.iter_mut().zip(values.iter().zip(&xs)) {
        let (true, Some(xi)) = (value.is_na(), *xi) else {
            continue;
        };
        let filled = match &spline {
            Some(spline) => spline.eval(xi),
            None => linear(&points, xi),
        };
        if let Some(y) = filled {
            *slot = Value::Float(y);
        }
    }
    Ok(out)
}

/// Index of the segment `[points[i], points[i + 1]]` containing `x`, if inside the range.
fn segment(points: &[(f64, f64)], x: f64) -> Option<usize> {
    let (first, last) = (points.first()?, points.last()?);
    if points.len() < 2 || x < first.0 || x > last.0 {
        return None;
    }
    let upper = points.partition_point(|p| p.0 < x);
    Some(upper.saturating_sub(1).min(points.len() - 2))
}

fn linear(points: &[(f64, f64)], x: f64) -> Option<f64> {
    if let [only] = points {
        return (only.0 == x).then_some(only.1);
    }
    let i = segment(points, x)?;
    let ((x0, y0), (x1, y1)) = (points[i], points[i + 1]);
    Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
}

/// Natural cubic spline: second derivatives vanish at both ends.
struct NaturalSpline<'a> {
    points: &'a [(f64, f64)],
    /// Second derivative at each knot.
    m: Vec<f64>,
}

impl<'a> NaturalSpline<'a> {
    fn fit(points: &'a [(f64, f64)]) -> Self {
        let n = points.len();
        let h: Vec<f64> = points.windows(2).map(|w| w[1].0 - w[0].0).collect();
        let mut m = vec![0.0; n];
        // tridiagonal system for m[1..n-1], solved with the Thomas algorithm
        let mut diag = vec![0.0; n];
        let mut rhs = vec![0.0; n];
        for i in 1..n - 1 {
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            let right = (points[i + 1].1 - points[i].1) / h[i];
            let left = (points[i].1 - points[i - 1].1) / h[i - 1];
            rhs[i] = 6.0 * (right - left);
        }
        for i in 2..n - 1 {
            let w = h[i - 1] / diag[i - 1];
            diag[i] -= w * h[i - 1];
            rhs[i] -= w * rhs[i - 1];
        }
        for i in (1..n - 1).rev() {
            m[i] = (rhs[i] - h[i] * m[i + 1]) / diag[i];
        }
        Self { points, m }
    }

    fn eval(&self, x: f64) -> Option<f64> {
        let i = segment(self.points, x)?;
        let ((x0, y0), (x1, y1)) = (self.points[i], self.points[i + 1]);
        let h = x1 - x0;
        let a = (x1 - x) / h;
        let b = (x - x0) / h;
        Some(
            a * y0
                + b * y1
                + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ints(items: &[i64]) -> Vec<Value> {
        items.iter().map(|&v| Value::Int(v)).collect()
    }

    fn floats(values: &[Value]) -> Vec<f64> {
        values.iter().map(|v| v.as_f64().unwrap_or(f64::NAN)).collect()
    }

    #[test]
    fn average_ranks_split_ties() {
        let ranks = rank(&ints(&[3, 1, 4, 1, 5]), RankOptions::default());
        assert_eq!(floats(&ranks), vec![3.0, 1.5, 4.0, 1.5, 5.0]);
    }

    #[test]
    fn tie_methods_and_direction() {
        let values = ints(&[10, 20, 20, 30]);
        let with = |ties, descending| rank(&values, RankOptions { ties, descending });
        assert_eq!(with(TieMethod::Min, false), ints(&[1, 2, 2, 4]));
        assert_eq!(with(TieMethod::Max, false), ints(&[1, 3, 3, 4]));
        assert_eq!(with(TieMethod::Dense, false), ints(&[1, 2, 2, 3]));
        assert_eq!(with(TieMethod::Min, true), ints(&[4, 2, 2, 1]));
    }

    #[test]
    fn missing_values_are_not_ranked() {
        let values = vec![Value::Int(2), Value::Null, Value::Int(1)];
        let ranks = rank(&values, RankOptions::default());
        assert_eq!(ranks, vec![Value::Float(2.0), Value::Absent, Value::Float(1.0)]);
    }

    #[test]
    fn lag_and_lead_fill_exposed_positions() {
        let values = ints(&[1, 2, 3]);
        assert_eq!(
            lag(&values, 1, None).unwrap(),
            vec![Value::Absent, Value::Int(1), Value::Int(2)]
        );
        assert_eq!(
            lead(&values, 2, Some(Value::Int(0))).unwrap(),
            vec![Value::Int(3), Value::Int(0), Value::Int(0)]
        );
        assert_eq!(lag(&values, 0, None).unwrap(), values);
        assert_eq!(lag(&values, 5, None).unwrap(), vec![Value::Absent; 3]);
        assert!(matches!(lead(&values, -1, None), Err(FrameError::NegativeShift(-1))));
    }

    #[test]
    fn propagate_poisons_after_first_missing() {
        let values = vec![Value::Int(1), Value::Int(2), Value::Null, Value::Int(4)];
        assert_eq!(
            cumsum(&values, FoldMode::Propagate).unwrap(),
            vec![Value::Float(1.0), Value::Float(3.0), Value::Null, Value::Null]
        );
        let nan = vec![Value::Int(1), Value::Float(f64::NAN), Value::Int(3)];
        let out = cummax(&nan, FoldMode::Propagate).unwrap();
        assert!(out[1].as_f64().is_some_and(f64::is_nan));
        assert!(out[2].as_f64().is_some_and(f64::is_nan));
    }

    #[test]
    fn remove_mode_skips_missing() {
        let values = vec![
            Value::Int(1),
            Value::Null,
            Value::Int(3),
            Value::Int(4),
            Value::Int(5),
        ];
        assert_eq!(
            floats(&cumsum(&values, FoldMode::Remove).unwrap()),
            vec![1.0, 1.0, 4.0, 8.0, 13.0]
        );
        let leading = vec![Value::Null, Value::Int(2), Value::Int(4)];
        assert_eq!(
            cummean(&leading, FoldMode::Remove).unwrap(),
            vec![Value::Null, Value::Float(2.0), Value::Float(3.0)]
        );
        assert_eq!(
            cumprod(&leading, FoldMode::Remove).unwrap(),
            vec![Value::Null, Value::Float(2.0), Value::Float(8.0)]
        );
        assert_eq!(
            cummin(&leading, FoldMode::Remove).unwrap(),
            vec![Value::Null, Value::Float(2.0), Value::Float(2.0)]
        );
    }

    #[test]
    fn linear_interpolation_leaves_edges_alone() {
        let values = vec![Value::Null, Value::Int(0), Value::Null, Value::Int(10), Value::Null];
        let x = ints(&[0, 1, 2, 6, 7]);
        let out = interpolate(&values, &x, InterpolationMethod::Linear).unwrap();
        assert_eq!(
            out,
            vec![Value::Null, Value::Int(0), Value::Float(2.0), Value::Int(10), Value::Null]
        );
    }

    #[test]
    fn spline_falls_back_to_linear_with_few_points() {
        let values = vec![Value::Int(0), Value::Null, Value::Int(4)];
        let x = ints(&[0, 1, 2]);
        let out = interpolate(&values, &x, InterpolationMethod::Spline).unwrap();
        assert_eq!(out[1], Value::Float(2.0));
    }

    #[test]
    fn spline_reproduces_a_straight_line() {
        let values = vec![
            Value::Int(0),
            Value::Int(2),
            Value::Null,
            Value::Int(6),
            Value::Int(8),
        ];
        let x = ints(&[0, 1, 2, 3, 4]);
        let out = interpolate(&values, &x, InterpolationMethod::Spline).unwrap();
        let y = out[2].as_f64().unwrap();
        assert!((y - 4.0).abs() < 1e-9, "got {y}");
    }

    #[test]
    fn spline_follows_curved_data() {
        // knots (0,0) (1,1) (2,0) (3,1) have second derivatives [0, -4, 4, 0]
        let values = vec![
            Value::Int(0),
            Value::Null,
            Value::Int(1),
            Value::Int(0),
            Value::Null,
            Value::Int(1),
        ];
        let x: Vec<Value> = [0.0, 0.5, 1.0, 2.0, 2.5, 3.0]
            .into_iter()
            .map(Value::Float)
            .collect();
        let out = interpolate(&values, &x, InterpolationMethod::Spline).unwrap();
        let (first, second) = (out[1].as_f64().unwrap(), out[4].as_f64().unwrap());
        assert!((first - 0.75).abs() < 1e-9, "got {first}");
        assert!((second - 0.25).abs() < 1e-9, "got {second}");

        let linear = interpolate(&values, &x, InterpolationMethod::Linear).unwrap();
        assert_eq!(linear[1], Value::Float(0.5));
    }

    #[test]
    fn interpolate_checks_lengths() {
        assert!(matches!(
            interpolate(&ints(&[1]), &[], InterpolationMethod::Linear),
            Err(FrameError::LengthMismatch { .. })
        ));
    }
}
