use std::collections::BTreeSet;
use std::fmt;

use log::{info, warn};

use super::config::FastTextConfig;
use super::corpus::write_labeled_corpus;
use super::error::ClassifierError;
use super::probability::ProbabilityTable;
use super::utils::strip_label;
use crate::backend::{Backend, FastTextCli, Predictions, TrainedModel};

/// Whether an estimator has been fitted, and with what.
#[derive(Debug)]
pub enum FitState<M> {
    Unfitted,
    Fitted {
        model: M,
        /// Distinct training labels, sorted
        classes: Vec<String>,
    },
}

/// A fit/predict estimator over a fastText-style supervised backend.
///
/// # Example
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use fasttext_estimator::{FastTextClassifier, FastTextConfig};
///
/// let mut clf = FastTextClassifier::with_default_backend(FastTextConfig::default())?;
/// let docs = vec![vec!["great", "movie"], vec!["awful", "plot"]];
/// clf.fit(&docs, &["pos", "neg"])?;
///
/// let labels = clf.predict(&[vec!["great", "plot"]])?;
/// let proba = clf.predict_proba(&[vec!["great", "plot"]])?;
/// println!("{:?} {:?}", labels, proba.row(0));
/// # Ok(())
/// # }
/// ```
pub struct FastTextClassifier<B: Backend = FastTextCli> {
    config: FastTextConfig,
    backend: B,
    state: FitState<B::Model>,
}

impl<B: Backend> fmt::Debug for FastTextClassifier<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastTextClassifier")
            .field("config", &self.config)
            .field("classes", &self.classes())
            .finish()
    }
}

impl FastTextClassifier<FastTextCli> {
    /// Creates an estimator driving the `fasttext` executable found via `$FASTTEXT_BIN` or `PATH`
    pub fn with_default_backend(config: FastTextConfig) -> Result<Self, ClassifierError> {
        Self::new(config, FastTextCli::from_env())
    }
}

impl<B: Backend> FastTextClassifier<B> {
    /// Creates an unfitted estimator.
    ///
    /// # Errors
    /// - `ValidationError` if the config is out of range
    pub fn new(config: FastTextConfig, backend: B) -> Result<Self, ClassifierError> {
        config.validate()?;
        Ok(Self {
            config,
            backend,
            state: FitState::Unfitted,
        })
    }

    pub fn config(&self) -> &FastTextConfig {
        &self.config
    }

    /// Replaces the hyperparameters used by the next `fit`. A fitted model is kept.
    pub fn set_config(&mut self, config: FastTextConfig) -> Result<(), ClassifierError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> &FitState<B::Model> {
        &self.state
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self.state, FitState::Fitted { .. })
    }

    /// Sorted distinct training labels, once fitted
    pub fn classes(&self) -> Option<&[String]> {
        match &self.state {
            FitState::Fitted { classes, .. } => Some(classes),
            FitState::Unfitted => None,
        }
    }

    /// Discards the fitted model, returning the estimator to the unfitted state
    pub fn reset(&mut self) {
        self.state = FitState::Unfitted;
    }

    /// The trained backend model
    pub fn trained_model(&self) -> Result<&B::Model, ClassifierError> {
        self.fitted().map(|(model, _)| model)
    }

    fn fitted(&self) -> Result<(&B::Model, &[String]), ClassifierError> {
        match &self.state {
            FitState::Fitted { model, classes } => Ok((model, classes)),
            FitState::Unfitted => Err(ClassifierError::NotFittedError),
        }
    }

    /// Trains on tokenized documents and their labels, replacing any previous fit.
    ///
    /// The temporary corpus handed to the backend is removed before this returns,
    /// on success and on failure.
    ///
    /// # Errors
    /// - `ValidationError` if `docs` is empty, lengths differ, or a label is empty
    ///   or contains whitespace
    /// - `BackendError` if training fails
    /// - `IoError` if the corpus file cannot be written
    pub fn fit<D, T, L>(&mut self, docs: &[D], labels: &[L]) -> Result<&mut Self, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
        L: AsRef<str>,
    {
        if docs.is_empty() {
            return Err(ClassifierError::ValidationError("Cannot fit on zero documents".into()));
        }
        if docs.len() != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} documents but {} labels",
                docs.len(),
                labels.len()
            )));
        }
        if let Some(pos) = labels.iter().position(|l| l.as_ref().is_empty()) {
            return Err(ClassifierError::ValidationError(format!("Label {} is empty", pos)));
        }
        if let Some(label) = labels
            .iter()
            .map(AsRef::as_ref)
            .find(|l| l.chars().any(char::is_whitespace))
        {
            return Err(ClassifierError::ValidationError(format!(
                "Label {:?} contains whitespace",
                label
            )));
        }
        if docs
            .iter()
            .any(|doc| doc.as_ref().iter().any(|t| t.as_ref().contains(char::is_whitespace)))
        {
            warn!("Some tokens contain whitespace and will be split by the trainer");
        }

        let classes: Vec<String> = labels
            .iter()
            .map(|l| l.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let corpus = write_labeled_corpus(docs, labels, &self.config.label)?;
        info!(
            "Fitting on {} documents, {} classes ({})",
            corpus.len(),
            classes.len(),
            self.config
        );
        let model = self.backend.train(corpus.path(), &self.config)?;
        drop(corpus);

        self.state = FitState::Fitted { model, classes };
        info!("Fit complete");
        Ok(self)
    }

    /// Predicts the single best label for each document, in input order.
    ///
    /// # Errors
    /// - `NotFittedError` if called before `fit`
    /// - `BackendError` if the backend fails, returns the wrong number of rows,
    ///   or returns no label for a document
    pub fn predict<D, T>(&self, docs: &[D]) -> Result<Vec<String>, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        let (model, _) = self.fitted()?;
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let predictions = predict_rows(model, docs, 1)?;
        predictions
            .into_iter()
            .enumerate()
            .map(|(i, prediction)| {
                prediction
                    .into_iter()
                    .next()
                    .map(|(label, _)| strip_label(&label, &self.config.label).to_string())
                    .ok_or_else(|| {
                        ClassifierError::BackendError(format!("No label predicted for document {}", i))
                    })
            })
            .collect()
    }

    /// Predicts a probability for every trained class of each document.
    ///
    /// Columns follow discovery order; classes missing from a document's result
    /// are filled with [`PROBA_FLOOR`](super::probability::PROBA_FLOOR).
    ///
    /// # Errors
    /// - `NotFittedError` if called before `fit`
    /// - `BackendError` if the backend fails or returns the wrong number of rows
    pub fn predict_proba<D, T>(&self, docs: &[D]) -> Result<ProbabilityTable, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        let (model, classes) = self.fitted()?;
        let predictions = if docs.is_empty() {
            Vec::new()
        } else {
            predict_rows(model, docs, classes.len())?
        };
        Ok(ProbabilityTable::from_predictions(&predictions, &self.config.label))
    }

    /// Mean accuracy of `predict(docs)` against `labels`.
    ///
    /// # Errors
    /// - `ValidationError` if `docs` is empty or lengths differ
    /// - anything `predict` returns
    pub fn score<D, T, L>(&self, docs: &[D], labels: &[L]) -> Result<f32, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
        L: AsRef<str>,
    {
        if docs.is_empty() {
            return Err(ClassifierError::ValidationError("Cannot score zero documents".into()));
        }
        if docs.len() != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} documents but {} labels",
                docs.len(),
                labels.len()
            )));
        }

        let predicted = self.predict(docs)?;
        let correct = predicted
            .iter()
            .zip(labels)
            .filter(|&(p, l)| p == l.as_ref())
            .count();
        Ok(correct as f32 / docs.len() as f32)
    }
}

/// Runs the backend on `docs`, requiring exactly one row per document
fn predict_rows<M, D, T>(model: &M, docs: &[D], k: usize) -> Result<Predictions, ClassifierError>
where
    M: TrainedModel,
    D: AsRef<[T]>,
    T: AsRef<str>,
{
    let predictions = model.predict(&join_documents(docs), k)?;
    if predictions.len() != docs.len() {
        return Err(ClassifierError::BackendError(format!(
            "Backend returned {} predictions for {} documents",
            predictions.len(),
            docs.len()
        )));
    }
    Ok(predictions)
}

/// Space-joins each document's tokens into one line
fn join_documents<D, T>(docs: &[D]) -> Vec<String>
where
    D: AsRef<[T]>,
    T: AsRef<str>,
{
    docs.iter()
        .map(|doc| {
            doc.as_ref()
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<&str>>()
                .join(" ")
        })
        .collect()
}
