//! Statistics boundary.
//!
//! Pure functions over plain value sequences, meant to be called from `summarise` and `mutate`
//! callbacks. Every function takes a `remove_na` flag:
//! - `false`: any missing (or NaN) input makes the result `Null`;
//! - `true`: missing inputs are skipped.
//!
//! When no valid data remains the result is `Null` (except `sum`, which is `0`). Non-numeric,
//! non-missing input to a numeric function is an error.

use crate::column::infer_data_type;
use crate::error::{FrameError, FrameResult};
use crate::value::{DataType, Value};
use ordered_float::OrderedFloat;
use std::collections::HashSet;

/// Summary of one column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStats {
    pub dtype: DataType,
    pub distinct_count: u64,
    pub null_count: u64,
    pub absent_count: u64,
    pub min: Option<Value>,
    pub max: Option<Value>,
    /// Sum of numeric values, if the column holds any.
    pub sum: Option<f64>,
}

impl ColumnStats {
    pub fn compute(values: &[Value]) -> Self {
        let mut distinct: HashSet<&Value> = HashSet::new();
        let mut null_count = 0u64;
        let mut absent_count = 0u64;
        let mut min: Option<&Value> = None;
        let mut max: Option<&Value> = None;
        let mut sum: Option<f64> = None;

        for value in values {
            match value {
                Value::Null => null_count += 1,
                Value::Absent => absent_count += 1,
                other => {
                    distinct.insert(other);
                    if min.map_or(true, |m| other.total_cmp(m).is_lt()) {
                        min = Some(other);
                    }
                    if max.map_or(true, |m| other.total_cmp(m).is_gt()) {
                        max = Some(other);
                    }
                    if let Some(v) = other.as_f64() {
                        sum = Some(sum.unwrap_or(0.0) + v);
                    }
                }
            }
        }

        Self {
            dtype: infer_data_type(values),
            distinct_count: distinct.len() as u64,
            null_count,
            absent_count,
            min: min.cloned(),
            max: max.cloned(),
            sum,
        }
    }
}

/// Collect numeric inputs; `Ok(None)` means "missing input and `remove_na == false`".
fn numeric(values: &[Value], remove_na: bool) -> FrameResult<Option<Vec<f64>>> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        if value.is_na() {
            if remove_na {
                continue;
            }
            return Ok(None);
        }
        match value.as_f64() {
            Some(v) => out.push(v),
            None => {
                return Err(FrameError::InvalidArgument(format!(
                    "expected a numeric value, got {value}"
                )))
            }
        }
    }
    Ok(Some(out))
}

pub fn sum(values: &[Value], remove_na: bool) -> FrameResult<Value> {
    let all_int = values
        .iter()
        .filter(|v| !v.is_missing())
        .all(|v| matches!(v, Value::Int(_)));
    if all_int {
        let mut total: i64 = 0;
        for value in values {
            match value {
                Value::Int(v) => total = total.wrapping_add(*v),
                _ if remove_na => {}
                _ => return Ok(Value::Null),
            }
        }
        return Ok(Value::Int(total));
    }
    Ok(match numeric(values, remove_na)? {
        Some(nums) => Value::Float(nums.iter().sum()),
        None => Value::Null,
    })
}

pub fn mean(values: &[Value], remove_na: bool) -> FrameResult<Value> {
    Ok(match numeric(values, remove_na)? {
        Some(nums) if !nums.is_empty() => {
            Value::Float(nums.iter().sum::<f64>() / nums.len() as f64)
        }
        _ => Value::Null,
    })
}

pub fn median(values: &[Value], remove_na: bool) -> FrameResult<Value> {
    let Some(mut nums) = numeric(values, remove_na)? else {
        return Ok(Value::Null);
    };
    if nums.is_empty() {
        return Ok(Value::Null);
    }
    nums.sort_by_key(|v| OrderedFloat(*v));
    let mid = nums.len() / 2;
    let median = if nums.len() % 2 == 0 {
        (nums[mid - 1] + nums[mid]) / 2.0
    } else {
        nums[mid]
    };
    Ok(Value::Float(median))
}

/// Sample variance (`n - 1` denominator). Fewer than two valid values yields `Null`.
pub fn variance(values: &[Value], remove_na: bool) -> FrameResult<Value> {
    let Some(nums) = numeric(values, remove_na)? else {
        return Ok(Value::Null);
    };
    if nums.len() < 2 {
        return Ok(Value::Null);
    }
    let n = nums.len() as f64;
    let mean = nums.iter().sum::<f64>() / n;
    let ss: f64 = nums.iter().map(|v| (v - mean) * (v - mean)).sum();
    Ok(Value::Float(ss / (n - 1.0)))
}

pub fn sd(values: &[Value], remove_na: bool) -> FrameResult<Value> {
    Ok(match variance(values, remove_na)? {
        Value::Float(v) => Value::Float(v.sqrt()),
        other => other,
    })
}

fn extreme(values: &[Value], remove_na: bool, want: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in values {
        if value.is_na() {
            if remove_na {
                continue;
            }
            return Value::Null;
        }
        if best.map_or(true, |b| value.total_cmp(b) == want) {
            best = Some(value);
        }
    }
    best.cloned().unwrap_or(Value::Null)
}

/// Smallest value under [`Value::total_cmp`]; works for any orderable kind, not just numbers.
pub fn min(values: &[Value], remove_na: bool) -> Value {
    extreme(values, remove_na, std::cmp::Ordering::Less)
}

pub fn max(values: &[Value], remove_na: bool) -> Value {
    extreme(values, remove_na, std::cmp::Ordering::Greater)
}

/// Number of distinct values. With `remove_na`, missing values are not counted; otherwise
/// `Null` and `Absent` each count as one value when present.
pub fn n_distinct(values: &[Value], remove_na: bool) -> usize {
    values
        .iter()
        .filter(|v| !(remove_na && v.is_missing()))
        .collect::<HashSet<_>>()
        .len()
}

pub fn count_missing(values: &[Value]) -> usize {
    values.iter().filter(|v| v.is_missing()).count()
}
