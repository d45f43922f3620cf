pub mod config;
pub mod corpus;
pub mod embedding;
mod error;
pub mod estimator;
pub mod probability;
mod utils;

pub use config::{ConfigBuilder, FastTextConfig, LossName};
pub use corpus::{CorpusFile, LABEL_PREFIX};
pub use embedding::ClassEmbeddings;
pub use error::ClassifierError;
pub use estimator::{FastTextClassifier, FitState};
pub use probability::{ProbabilityTable, PROBA_FLOOR};
