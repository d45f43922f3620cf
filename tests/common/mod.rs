#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fasttext_estimator::classifier::corpus::parse_line;
use fasttext_estimator::{Backend, ClassifierError, FastTextConfig, TrainedModel};

pub const EMBEDDING_DIM: usize = 4;

/// Deterministic stand-in for the fastText trainer.
///
/// Reads the real corpus file, scores labels by token overlap, and writes a
/// real softmax export, so the temp-file protocol runs end to end.
#[derive(Default)]
pub struct KeywordBackend {
    /// Caps the number of labels returned per document, ignoring larger `k`
    pub max_k: Option<usize>,
    /// Makes `train` fail after reading the corpus
    pub fail_training: bool,
    /// Makes `save_softmax` write a malformed file
    pub broken_export: bool,
    pub corpora: RefCell<Vec<PathBuf>>,
    /// Export paths handed to every model this backend trained
    pub exports: Rc<RefCell<Vec<PathBuf>>>,
}

impl KeywordBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct KeywordModel {
    prefix: String,
    /// label -> token -> count, labels sorted
    counts: BTreeMap<String, HashMap<String, usize>>,
    max_k: Option<usize>,
    broken_export: bool,
    exports: Rc<RefCell<Vec<PathBuf>>>,
}

impl KeywordModel {
    pub fn labels(&self) -> Vec<&str> {
        self.counts.keys().map(String::as_str).collect()
    }

    pub fn exported_paths(&self) -> Vec<PathBuf> {
        self.exports.borrow().clone()
    }
}

impl Backend for KeywordBackend {
    type Model = KeywordModel;

    fn train(&self, corpus: &Path, config: &FastTextConfig) -> Result<KeywordModel, ClassifierError> {
        self.corpora.borrow_mut().push(corpus.to_path_buf());
        let content = fs::read_to_string(corpus)?;
        if self.fail_training {
            return Err(ClassifierError::BackendError("simulated trainer crash".into()));
        }

        let mut counts: BTreeMap<String, HashMap<String, usize>> = BTreeMap::new();
        for line in content.lines() {
            let (label, tokens) = parse_line(line, &config.label);
            let label = label.ok_or_else(|| {
                ClassifierError::BackendError(format!("unlabeled corpus line {:?}", line))
            })?;
            let entry = counts.entry(label).or_default();
            for token in tokens {
                *entry.entry(token).or_default() += 1;
            }
        }

        Ok(KeywordModel {
            prefix: config.label.clone(),
            counts,
            max_k: self.max_k,
            broken_export: self.broken_export,
            exports: Rc::clone(&self.exports),
        })
    }
}

impl TrainedModel for KeywordModel {
    fn predict(&self, docs: &[String], k: usize) -> Result<Vec<Vec<(String, f32)>>, ClassifierError> {
        let k = self.max_k.map_or(k, |cap| cap.min(k));
        Ok(docs
            .iter()
            .map(|doc| {
                let tokens: Vec<&str> = doc.split(' ').filter(|t| !t.is_empty()).collect();
                let raw: Vec<(&String, f32)> = self
                    .counts
                    .iter()
                    .map(|(label, counts)| {
                        let overlap: usize =
                            tokens.iter().filter_map(|t| counts.get(*t)).sum();
                        (label, 1.0 + overlap as f32)
                    })
                    .collect();
                let total: f32 = raw.iter().map(|(_, s)| s).sum();

                let mut scored: Vec<(String, f32)> = raw
                    .into_iter()
                    .map(|(label, s)| (format!("{}{}", self.prefix, label), s / total))
                    .collect();
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
                scored.truncate(k);
                scored
            })
            .collect())
    }

    fn save_softmax(&self, path: &Path) -> Result<(), ClassifierError> {
        self.exports.borrow_mut().push(path.to_path_buf());
        assert!(path.exists(), "export path should be pre-allocated");

        if self.broken_export {
            fs::write(path, "1 2\nno_prefix 1 2\n")?;
            return Ok(());
        }

        let mut export = format!("{} {}\n", self.counts.len(), EMBEDDING_DIM);
        for (i, (label, counts)) in self.counts.iter().enumerate() {
            let total: usize = counts.values().sum();
            export.push_str(&format!(
                "{}{} {} {} {} {} \n",
                self.prefix,
                label,
                i as f32,
                total as f32,
                counts.len() as f32,
                -0.5
            ));
        }
        fs::write(path, export)?;
        Ok(())
    }
}

pub fn to_docs(docs: &[&[&str]]) -> Vec<Vec<String>> {
    docs.iter()
        .map(|doc| doc.iter().map(|t| t.to_string()).collect())
        .collect()
}
