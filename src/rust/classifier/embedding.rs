use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

use log::info;
use ndarray::{Array2, ArrayView1};
use tempfile::NamedTempFile;

use super::error::ClassifierError;
use super::utils::cosine_similarity;
use crate::backend::TrainedModel;

/// Per-class vectors taken from the output layer of a trained model.
///
/// Row `i` of [`ClassEmbeddings::vectors`] belongs to `labels()[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassEmbeddings {
    labels: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Array2<f32>,
}

impl ClassEmbeddings {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Length of each class vector
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn get(&self, label: &str) -> Option<ArrayView1<'_, f32>> {
        self.index.get(label).map(|&i| self.vectors.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ArrayView1<'_, f32>)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), self.vectors.row(i)))
    }

    /// Cosine similarity between two class vectors
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        Some(cosine_similarity(self.get(a)?, self.get(b)?))
    }

    /// The `n` classes closest to `label`, most similar first, excluding `label` itself
    pub fn most_similar(&self, label: &str, n: usize) -> Option<Vec<(String, f32)>> {
        let target = self.get(label)?;
        let mut scores: Vec<(String, f32)> = self
            .iter()
            .filter(|(other, _)| *other != label)
            .map(|(other, vector)| (other.to_string(), cosine_similarity(target, vector)))
            .collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(n);
        Some(scores)
    }
}

/// Parses a softmax export into a class embedding table.
///
/// Format: a header line (ignored), then one row per class of single-space
/// separated fields. The first field is `<prefix><label>`, the rest are floats.
/// Consecutive or trailing spaces produce empty fields; columns that are empty in
/// every row are dropped before parsing.
///
/// # Errors
/// - `ParseError` if there are no rows, a label lacks the prefix, a label repeats,
///   a cell is empty in some rows only, or a value is not a float
/// - `IoError` if reading fails
pub fn parse_softmax_export<R: BufRead>(
    reader: R,
    prefix: &str,
) -> Result<ClassEmbeddings, ClassifierError> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    for line in reader.lines().skip(1) {
        let line = line?;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        rows.push(line.split(' ').map(str::to_string).collect());
    }
    if rows.is_empty() {
        return Err(ClassifierError::ParseError("Softmax export contains no class rows".into()));
    }

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let kept: Vec<usize> = (0..width)
        .filter(|&col| {
            rows.iter()
                .any(|row| row.get(col).is_some_and(|cell| !cell.is_empty()))
        })
        .collect();
    if kept.len() < 2 {
        return Err(ClassifierError::ParseError(
            "Softmax export needs a label column and at least one value column".into(),
        ));
    }

    let dim = kept.len() - 1;
    let mut labels = Vec::with_capacity(rows.len());
    let mut index = HashMap::with_capacity(rows.len());
    let mut values = Vec::with_capacity(rows.len() * dim);

    for (line_no, row) in rows.iter().enumerate() {
        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

        let raw_label = cell(kept[0]);
        let label = raw_label.strip_prefix(prefix).ok_or_else(|| {
            ClassifierError::ParseError(format!(
                "Row {}: label {:?} does not start with {:?}",
                line_no + 2,
                raw_label,
                prefix
            ))
        })?;
        if index.insert(label.to_string(), labels.len()).is_some() {
            return Err(ClassifierError::ParseError(format!(
                "Row {}: duplicate label {:?}",
                line_no + 2,
                label
            )));
        }
        labels.push(label.to_string());

        for &col in &kept[1..] {
            let raw = cell(col);
            if raw.is_empty() {
                return Err(ClassifierError::ParseError(format!(
                    "Row {}: missing value in column {}",
                    line_no + 2,
                    col
                )));
            }
            let value: f32 = raw.parse().map_err(|e| {
                ClassifierError::ParseError(format!(
                    "Row {}: invalid value {:?}: {}",
                    line_no + 2,
                    raw,
                    e
                ))
            })?;
            values.push(value);
        }
    }

    let vectors = Array2::from_shape_vec((labels.len(), dim), values)
        .map_err(|e| ClassifierError::ParseError(format!("Failed to shape embeddings: {}", e)))?;

    Ok(ClassEmbeddings {
        labels,
        index,
        vectors,
    })
}

/// Asks a trained model to write its softmax parameters and parses the result.
///
/// The export goes to a fresh temporary file that is removed before returning,
/// whether or not the export and the parse succeed.
pub fn export_class_embeddings<M: TrainedModel + ?Sized>(
    model: &M,
    prefix: &str,
) -> Result<ClassEmbeddings, ClassifierError> {
    let export = NamedTempFile::new()?;
    model.save_softmax(export.path())?;

    let reader = BufReader::new(File::open(export.path())?);
    let embeddings = parse_softmax_export(reader, prefix)?;
    info!(
        "Exported {} class embeddings of size {}",
        embeddings.len(),
        embeddings.dim()
    );
    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EXPORT: &str = "2 3\n__label__pos 0.5 -1 2 \n__label__neg 1.5 0 -2 \n";

    #[test]
    fn test_parse_with_trailing_blank_column() {
        let emb = parse_softmax_export(Cursor::new(EXPORT), "__label__").unwrap();

        assert_eq!(emb.len(), 2);
        assert_eq!(emb.dim(), 3);
        assert_eq!(emb.labels(), &["pos", "neg"]);
        assert_eq!(emb.get("pos").unwrap().to_vec(), vec![0.5, -1.0, 2.0]);
        assert_eq!(emb.get("neg").unwrap().to_vec(), vec![1.5, 0.0, -2.0]);
        assert!(emb.get("other").is_none());
    }

    #[test]
    fn test_parse_drops_inner_blank_column() {
        let export = "header\n__label__a 1  2\n__label__b 3  4\n";
        let emb = parse_softmax_export(Cursor::new(export), "__label__").unwrap();
        assert_eq!(emb.dim(), 2);
        assert_eq!(emb.get("b").unwrap().to_vec(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_parse_errors() {
        let missing_prefix = "h\nlabel_a 1 2\n";
        assert!(matches!(
            parse_softmax_export(Cursor::new(missing_prefix), "__label__"),
            Err(ClassifierError::ParseError(_))
        ));

        let duplicate = "h\n__label__a 1 2\n__label__a 3 4\n";
        assert!(matches!(
            parse_softmax_export(Cursor::new(duplicate), "__label__"),
            Err(ClassifierError::ParseError(_))
        ));

        let ragged = "h\n__label__a 1 2\n__label__b 3\n";
        assert!(matches!(
            parse_softmax_export(Cursor::new(ragged), "__label__"),
            Err(ClassifierError::ParseError(_))
        ));

        let not_a_float = "h\n__label__a 1 x\n";
        assert!(matches!(
            parse_softmax_export(Cursor::new(not_a_float), "__label__"),
            Err(ClassifierError::ParseError(_))
        ));

        assert!(matches!(
            parse_softmax_export(Cursor::new("2 3\n"), "__label__"),
            Err(ClassifierError::ParseError(_))
        ));
    }

    #[test]
    fn test_similarity() {
        let export = "3 2\n__label__a 1 0\n__label__b 2 0\n__label__c 0 1\n";
        let emb = parse_softmax_export(Cursor::new(export), "__label__").unwrap();

        assert!((emb.similarity("a", "b").unwrap() - 1.0).abs() < 1e-6);
        assert!(emb.similarity("a", "c").unwrap().abs() < 1e-6);
        assert!(emb.similarity("a", "missing").is_none());

        let nearest = emb.most_similar("a", 1).unwrap();
        assert_eq!(nearest.len(), 1);
        assert_eq!(nearest[0].0, "b");
    }
}
