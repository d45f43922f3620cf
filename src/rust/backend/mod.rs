//! The seam between the estimator and the external fastText component.
//!
//! The estimator only ever talks to fastText through these two traits: a
//! [`Backend`] trains from a corpus file and hands back an opaque
//! [`TrainedModel`], which answers top-k queries and exports its softmax layer.

use std::path::Path;

use crate::classifier::{ClassifierError, FastTextConfig};

pub mod cli;

pub use cli::{CliModel, FastTextCli};

/// One `(label, score)` list per queried document, best first. Labels keep
/// their prefix.
pub type Predictions = Vec<Vec<(String, f32)>>;

/// Entry point of an external supervised trainer.
pub trait Backend {
    type Model: TrainedModel;

    /// Trains on the corpus at `corpus` with exactly the given hyperparameters
    fn train(&self, corpus: &Path, config: &FastTextConfig) -> Result<Self::Model, ClassifierError>;
}

/// A trained model handle owned by the estimator.
pub trait TrainedModel {
    /// Returns the `k` best labels with scores for each document.
    ///
    /// Documents are single lines of space-separated tokens. The result has one
    /// entry per document, in input order.
    fn predict(&self, docs: &[String], k: usize) -> Result<Predictions, ClassifierError>;

    /// Writes the per-class output-layer weights to `path`.
    ///
    /// Format: a header line, then `<prefix><label> <v1> ... <vd>` per class.
    fn save_softmax(&self, path: &Path) -> Result<(), ClassifierError>;
}
