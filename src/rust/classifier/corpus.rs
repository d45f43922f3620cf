//! Line-oriented corpus files consumed by the fastText trainer.
//!
//! Each document becomes one line: `<prefix><label> <token> <token> ...` when
//! labeled, `<token> <token> ...` otherwise. Tokens are written verbatim, so a
//! token containing whitespace splits into several tokens on the trainer side.

use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use tempfile::NamedTempFile;

use super::error::ClassifierError;

/// Default prefix marking the label token of a corpus line
pub const LABEL_PREFIX: &str = "__label__";

/// A transient corpus file that is deleted when dropped.
#[derive(Debug)]
pub struct CorpusFile {
    file: NamedTempFile,
    lines: usize,
}

impl CorpusFile {
    /// Location to hand to the external trainer
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of documents written
    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }
}

/// Formats one document as a corpus line, without the trailing newline.
pub fn format_line<T: AsRef<str>>(tokens: &[T], label: Option<&str>, prefix: &str) -> String {
    let mut line = String::new();
    if let Some(label) = label {
        line.push_str(prefix);
        line.push_str(label);
    }
    for token in tokens {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(token.as_ref());
    }
    line
}

/// Splits a corpus line back into its label (prefix removed) and tokens.
///
/// Only the first token is inspected for a label, matching how lines are written.
pub fn parse_line(line: &str, prefix: &str) -> (Option<String>, Vec<String>) {
    let mut tokens = line.split_whitespace();
    let mut label = None;
    let mut rest = Vec::new();

    if let Some(first) = tokens.next() {
        match first.strip_prefix(prefix) {
            Some(stripped) => label = Some(stripped.to_string()),
            None => rest.push(first.to_string()),
        }
    }
    rest.extend(tokens.map(str::to_string));
    (label, rest)
}

/// Writes labeled documents to a fresh temporary corpus file.
///
/// # Errors
/// - `ValidationError` if `docs` and `labels` differ in length
/// - `IoError` if the temporary file cannot be created or written
pub fn write_labeled_corpus<D, T, L>(
    docs: &[D],
    labels: &[L],
    prefix: &str,
) -> Result<CorpusFile, ClassifierError>
where
    D: AsRef<[T]>,
    T: AsRef<str>,
    L: AsRef<str>,
{
    if docs.len() != labels.len() {
        return Err(ClassifierError::ValidationError(format!(
            "Got {} documents but {} labels",
            docs.len(),
            labels.len()
        )));
    }

    write_lines(
        docs.iter()
            .zip(labels)
            .map(|(doc, label)| format_line(doc.as_ref(), Some(label.as_ref()), prefix)),
    )
}

/// Writes unlabeled documents to a fresh temporary corpus file.
pub fn write_unlabeled_corpus<D, T>(docs: &[D]) -> Result<CorpusFile, ClassifierError>
where
    D: AsRef<[T]>,
    T: AsRef<str>,
{
    write_lines(docs.iter().map(|doc| format_line(doc.as_ref(), None, "")))
}

fn write_lines<I>(lines: I) -> Result<CorpusFile, ClassifierError>
where
    I: Iterator<Item = String>,
{
    let file = NamedTempFile::new()?;
    let mut count = 0;
    let mut warned = false;
    {
        let mut writer = BufWriter::new(file.as_file());
        for line in lines {
            if !warned && line.contains(['\n', '\r']) {
                warn!("Document {} contains a line break; the corpus file will be misaligned", count);
                warned = true;
            }
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            count += 1;
        }
        writer.flush()?;
    }
    debug!("Wrote {} corpus lines to {:?}", count, file.path());

    Ok(CorpusFile { file, lines: count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(&["a", "b"], Some("pos"), LABEL_PREFIX), "__label__pos a b");
        assert_eq!(format_line(&["a", "b"], None, LABEL_PREFIX), "a b");
        assert_eq!(format_line::<&str>(&[], Some("neg"), "#"), "#neg");
    }

    #[test]
    fn test_labeled_corpus_contents() {
        let docs = vec![vec!["a", "b"], vec!["c"]];
        let corpus = write_labeled_corpus(&docs, &["1", "2"], LABEL_PREFIX).unwrap();

        assert_eq!(corpus.len(), 2);
        let content = fs::read_to_string(corpus.path()).unwrap();
        assert_eq!(content, "__label__1 a b\n__label__2 c\n");
    }

    #[test]
    fn test_unlabeled_round_trip() {
        let docs = vec![
            vec!["the".to_string(), "quick".to_string(), "fox".to_string()],
            vec!["jumps".to_string()],
            vec!["over".to_string(), "it".to_string()],
        ];
        let corpus = write_unlabeled_corpus(&docs).unwrap();
        let content = fs::read_to_string(corpus.path()).unwrap();

        let decoded: Vec<Vec<String>> = content
            .lines()
            .map(|line| parse_line(line, LABEL_PREFIX).1)
            .collect();
        assert_eq!(decoded, docs);
    }

    #[test]
    fn test_labeled_round_trip() {
        let docs = vec![vec!["x", "y"], vec!["z"]];
        let corpus = write_labeled_corpus(&docs, &["spam", "ham"], LABEL_PREFIX).unwrap();
        let content = fs::read_to_string(corpus.path()).unwrap();

        let parsed: Vec<_> = content.lines().map(|l| parse_line(l, LABEL_PREFIX)).collect();
        assert_eq!(parsed[0], (Some("spam".into()), vec!["x".into(), "y".into()]));
        assert_eq!(parsed[1], (Some("ham".into()), vec!["z".into()]));
    }

    #[test]
    fn test_length_mismatch() {
        let docs = vec![vec!["a"]];
        let result = write_labeled_corpus(&docs, &["1", "2"], LABEL_PREFIX);
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_file_removed_on_drop() {
        let docs = vec![vec!["a"]];
        let corpus = write_unlabeled_corpus(&docs).unwrap();
        let path = corpus.path().to_path_buf();
        assert!(path.exists());
        drop(corpus);
        assert!(!path.exists());
    }

    #[test]
    fn test_unique_paths() {
        let docs = vec![vec!["a"]];
        let first = write_unlabeled_corpus(&docs).unwrap();
        let second = write_unlabeled_corpus(&docs).unwrap();
        assert_ne!(first.path(), second.path());
    }
}
