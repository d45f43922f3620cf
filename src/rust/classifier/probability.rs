use std::collections::HashMap;

use ndarray::Array2;

use super::utils::strip_label;

/// Probability assigned to a label that is missing from a document's prediction.
///
/// A small positive value instead of zero keeps log-probabilities finite downstream.
pub const PROBA_FLOOR: f64 = 1e-10;

/// Per-document class probabilities, one row per document.
///
/// Values are stored as `f64` so that floor-filled cells stay visible in row sums;
/// backend scores are widened on insert.
///
/// Columns are the labels encountered while building the table, in the order they
/// were first seen. That order depends on the predictions, not on the trained class
/// set; use [`ProbabilityTable::reindex`] when a fixed column order is required.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl ProbabilityTable {
    /// Assembles a table from raw `(label, score)` predictions, one list per document.
    ///
    /// Labels are stripped of `prefix`. When a label repeats inside one document's
    /// list, the later score wins. Cells for labels a document did not return are
    /// set to [`PROBA_FLOOR`].
    pub fn from_predictions(predictions: &[Vec<(String, f32)>], prefix: &str) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut cells: Vec<Vec<(usize, f64)>> = Vec::with_capacity(predictions.len());

        for prediction in predictions {
            let mut row = Vec::with_capacity(prediction.len());
            for (label, score) in prediction {
                let label = strip_label(label, prefix);
                let col = match index.get(label) {
                    Some(&col) => col,
                    None => {
                        let col = columns.len();
                        columns.push(label.to_string());
                        index.insert(label.to_string(), col);
                        col
                    }
                };
                row.push((col, f64::from(*score)));
            }
            cells.push(row);
        }

        let mut values = Array2::from_elem((predictions.len(), columns.len()), PROBA_FLOOR);
        for (i, row) in cells.into_iter().enumerate() {
            for (col, score) in row {
                values[[i, col]] = score;
            }
        }

        Self { columns, values }
    }

    /// Column labels in discovery order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The probability matrix, shape `(n_rows, columns.len())`
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// Probability of `label` for document `row`, if both exist
    pub fn get(&self, row: usize, label: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == label)?;
        self.values.get([row, col]).copied()
    }

    /// Label/probability pairs of one document, in column order
    pub fn row(&self, row: usize) -> Option<Vec<(String, f64)>> {
        if row >= self.n_rows() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(self.values.row(row).iter().copied())
                .collect(),
        )
    }

    /// Sum of each row.
    ///
    /// Equals 1 (up to the backend's rounding) only when no cell was floor-filled;
    /// each filled cell adds [`PROBA_FLOOR`], so a row missing `n` labels sums to
    /// `1 + n * PROBA_FLOOR`. Rows are not renormalized.
    pub fn row_sums(&self) -> Vec<f64> {
        self.values.rows().into_iter().map(|r| r.sum()).collect()
    }

    /// Highest-probability label of each row
    pub fn predicted_labels(&self) -> Vec<String> {
        self.values
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(col, _)| self.columns[col].clone())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Returns a table whose columns are exactly `labels`, in that order.
    ///
    /// Labels absent from this table are filled with [`PROBA_FLOOR`]; columns not
    /// listed are dropped.
    pub fn reindex<S: AsRef<str>>(&self, labels: &[S]) -> Self {
        let mut values = Array2::from_elem((self.n_rows(), labels.len()), PROBA_FLOOR);
        for (new_col, label) in labels.iter().enumerate() {
            if let Some(old_col) = self.columns.iter().position(|c| c == label.as_ref()) {
                values.column_mut(new_col).assign(&self.values.column(old_col));
            }
        }

        Self {
            columns: labels.iter().map(|l| l.as_ref().to_string()).collect(),
            values,
        }
    }
}
