//! Contingency tables over two columns.

use crate::column::Column;
use crate::error::FrameResult;
use crate::frame::Frame;
use crate::value::Value;
use std::collections::HashMap;

/// Counts of every (row value, column value) pair of two columns.
///
/// Labels are in first-seen order. Missing values are ordinary categories that compare by
/// value, as in grouping, so nulls and absent cells get a label each.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrossTab {
    pub row_variable: String,
    pub col_variable: String,
    pub row_labels: Vec<Value>,
    pub col_labels: Vec<Value>,
    /// `counts[r][c]` rows have `row_labels[r]` and `col_labels[c]`.
    pub counts: Vec<Vec<usize>>,
}

impl CrossTab {
    pub fn row_totals(&self) -> Vec<usize> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<usize> {
        (0..self.col_labels.len())
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// One line per column label: `"<row label>: <count> (<share>%)"` for every row label,
    /// joined with `"; "`. Shares are of the column total, to one decimal place.
    pub fn summary_by_column(&self) -> Vec<(String, String)> {
        let totals = self.col_totals();
        self.col_labels
            .iter()
            .enumerate()
            .map(|(c, label)| {
                let parts: Vec<String> = self
                    .row_labels
                    .iter()
                    .zip(&self.counts)
                    .map(|(row_label, row)| {
                        let share = if totals[c] > 0 {
                            row[c] as f64 / totals[c] as f64 * 100.0
                        } else {
                            0.0
                        };
                        format!("{row_label}: {} ({share:.1}%)", row[c])
                    })
                    .collect();
                (label.to_string(), parts.join("; "))
            })
            .collect()
    }

    /// The table as a frame: the row labels under `row_variable`, then one count column per
    /// column label, named by its display form.
    pub fn to_frame(&self) -> FrameResult<Frame> {
        let mut columns = vec![(
            self.row_variable.clone(),
            Column::new(self.row_labels.clone()),
        )];
        for (c, label) in self.col_labels.iter().enumerate() {
            columns.push((
                label.to_string(),
                self.counts.iter().map(|row| row[c]).collect(),
            ));
        }
        Frame::from_columns(columns)
    }
}

fn label_index<'a>(
    labels: &mut Vec<&'a Value>,
    index: &mut HashMap<&'a Value, usize>,
    value: &'a Value,
) -> usize {
    *index.entry(value).or_insert_with(|| {
        labels.push(value);
        labels.len() - 1
    })
}

impl Frame {
    /// Count how often each combination of `rows` and `cols` values occurs.
    pub fn cross_tabulate(&self, rows: &str, cols: &str) -> FrameResult<CrossTab> {
        let row_column = self.column(rows)?;
        let col_column = self.column(cols)?;

        let (mut row_labels, mut row_index) = (Vec::new(), HashMap::new());
        let (mut col_labels, mut col_index) = (Vec::new(), HashMap::new());
        let mut pairs: HashMap<(usize, usize), usize> = HashMap::new();
        for (row_value, col_value) in row_column.iter().zip(col_column.iter()) {
            let r = label_index(&mut row_labels, &mut row_index, row_value);
            let c = label_index(&mut col_labels, &mut col_index, col_value);
            *pairs.entry((r, c)).or_default() += 1;
        }

        let counts = (0..row_labels.len())
            .map(|r| {
                (0..col_labels.len())
                    .map(|c| pairs.get(&(r, c)).copied().unwrap_or(0))
                    .collect()
            })
            .collect();
        log::debug!(
            "cross_tabulate: {} x {} table over {} rows",
            row_labels.len(),
            col_labels.len(),
            self.len()
        );
        Ok(CrossTab {
            row_variable: rows.to_string(),
            col_variable: cols.to_string(),
            row_labels: row_labels.into_iter().cloned().collect(),
            col_labels: col_labels.into_iter().cloned().collect(),
            counts,
        })
    }
}
