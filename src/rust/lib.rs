//! A fit/predict estimator around the fastText supervised text classifier.
//!
//! Training data crosses into fastText through a temporary line-oriented corpus
//! file, predictions come back as labels or as a [`ProbabilityTable`], and the
//! trained output layer is exported as a per-class [`ClassEmbeddings`] table.
//! Every temporary artifact is removed when the call that created it returns.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use fasttext_estimator::{FastTextConfig, FastTextModel};
//!
//! let config = FastTextConfig::builder()
//!     .with_epoch(25)
//!     .with_word_ngrams(2)
//!     .build()?;
//! let mut model = FastTextModel::with_default_backend(config)?;
//!
//! let docs = vec![
//!     vec!["what", "a", "great", "movie"],
//!     vec!["terrible", "acting", "and", "plot"],
//! ];
//! model.fit(&docs, &["positive", "negative"])?;
//!
//! let labels = model.predict(&[vec!["great", "plot"]])?;
//! println!("Predicted class: {}", labels[0]);
//!
//! let embeddings = model.class_embeddings().expect("fitted");
//! println!("Embedding size: {}", embeddings.dim());
//! # Ok(())
//! # }
//! ```
//!
//! # Backends
//!
//! The shipped [`FastTextCli`] backend drives the `fasttext` executable, located
//! through the `FASTTEXT_BIN` environment variable or the `PATH`. Anything that
//! implements [`Backend`] can stand in for it.

pub mod backend;
pub mod classifier;
pub mod model;

pub use backend::{Backend, CliModel, FastTextCli, TrainedModel};
pub use classifier::{
    ClassEmbeddings, ClassifierError, ConfigBuilder, CorpusFile, FastTextClassifier,
    FastTextConfig, FitState, LossName, ProbabilityTable, LABEL_PREFIX, PROBA_FLOOR,
};
pub use model::{FastTextModel, ModelInfo};

pub fn init_logger() {
    env_logger::init();
}
