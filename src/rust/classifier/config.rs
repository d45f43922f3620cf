use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::corpus::LABEL_PREFIX;
use super::error::ClassifierError;

/// Loss function used by the fastText trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossName {
    Softmax,
    /// Hierarchical softmax
    Hs,
    /// Negative sampling
    Ns,
    /// One-vs-all
    Ova,
}

impl LossName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Softmax => "softmax",
            Self::Hs => "hs",
            Self::Ns => "ns",
            Self::Ova => "ova",
        }
    }
}

impl fmt::Display for LossName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hyperparameters handed to the fastText supervised trainer.
///
/// Every accepted option is listed here; nothing else is forwarded. Values are
/// checked by [`FastTextConfig::validate`], which the builder, the JSON loader and
/// the estimator constructor all run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastTextConfig {
    /// Learning rate
    pub lr: f32,
    /// Size of word vectors
    pub dim: u32,
    /// Size of the context window
    pub ws: u32,
    /// Number of epochs
    pub epoch: u32,
    /// Minimal number of word occurrences
    pub min_count: u32,
    /// Minimal number of label occurrences
    pub min_count_label: u32,
    /// Min length of char ngram
    pub minn: u32,
    /// Max length of char ngram
    pub maxn: u32,
    /// Number of negatives sampled
    pub neg: u32,
    /// Max length of word ngram
    pub word_ngrams: u32,
    pub loss: LossName,
    /// Number of hashing buckets
    pub bucket: u32,
    /// Number of trainer threads
    pub thread: u32,
    /// Rate of updates for the learning rate
    pub lr_update_rate: u32,
    /// Sampling threshold
    pub t: f32,
    /// Label prefix marking the label token of a corpus line
    pub label: String,
    /// Trainer verbosity level, 0 to 2
    pub verbose: u8,
}

impl Default for FastTextConfig {
    fn default() -> Self {
        Self {
            lr: 0.1,
            dim: 100,
            ws: 5,
            epoch: 5,
            min_count: 1,
            min_count_label: 0,
            minn: 0,
            maxn: 0,
            neg: 5,
            word_ngrams: 1,
            loss: LossName::Softmax,
            bucket: 2_000_000,
            thread: 12,
            lr_update_rate: 100,
            t: 1e-4,
            label: LABEL_PREFIX.to_string(),
            verbose: 2,
        }
    }
}

impl fmt::Display for FastTextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lr={} dim={} ws={} epoch={} minCount={} minCountLabel={} minn={} maxn={} \
             neg={} wordNgrams={} loss={} bucket={} thread={} lrUpdateRate={} t={} label={} verbose={}",
            self.lr,
            self.dim,
            self.ws,
            self.epoch,
            self.min_count,
            self.min_count_label,
            self.minn,
            self.maxn,
            self.neg,
            self.word_ngrams,
            self.loss,
            self.bucket,
            self.thread,
            self.lr_update_rate,
            self.t,
            self.label,
            self.verbose,
        )
    }
}

impl FastTextConfig {
    /// Creates a new ConfigBuilder starting from the default hyperparameters
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Loads a config from a JSON file. Missing keys take their default value.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: FastTextConfig = serde_json::from_str(&content).map_err(|e| {
            ClassifierError::ValidationError(format!(
                "Invalid config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every hyperparameter against the range fastText accepts.
    ///
    /// # Errors
    /// - `ValidationError` naming the first offending field
    pub fn validate(&self) -> Result<(), ClassifierError> {
        fn invalid(msg: String) -> Result<(), ClassifierError> {
            Err(ClassifierError::ValidationError(msg))
        }

        if !self.lr.is_finite() || self.lr <= 0.0 {
            return invalid(format!("lr must be a positive number, got {}", self.lr));
        }
        if self.dim == 0 {
            return invalid("dim must be at least 1".into());
        }
        if self.ws == 0 {
            return invalid("ws must be at least 1".into());
        }
        if self.epoch == 0 {
            return invalid("epoch must be at least 1".into());
        }
        if self.maxn > 0 && self.minn > self.maxn {
            return invalid(format!(
                "minn ({}) cannot exceed maxn ({})",
                self.minn, self.maxn
            ));
        }
        if self.word_ngrams == 0 {
            return invalid("wordNgrams must be at least 1".into());
        }
        if self.bucket == 0 && (self.word_ngrams > 1 || self.maxn > 0) {
            return invalid("bucket must be positive when word or char ngrams are enabled".into());
        }
        if self.thread == 0 {
            return invalid("thread must be at least 1".into());
        }
        if self.lr_update_rate == 0 {
            return invalid("lrUpdateRate must be at least 1".into());
        }
        if !self.t.is_finite() || self.t <= 0.0 {
            return invalid(format!("t must be a positive number, got {}", self.t));
        }
        if self.label.is_empty() {
            return invalid("label prefix cannot be empty".into());
        }
        if self.label.chars().any(char::is_whitespace) {
            return invalid(format!("label prefix {:?} cannot contain whitespace", self.label));
        }
        if self.verbose > 2 {
            return invalid(format!("verbose must be between 0 and 2, got {}", self.verbose));
        }
        Ok(())
    }

    /// Renders the hyperparameters as fastText command-line flags
    pub fn to_args(&self) -> Vec<String> {
        let pairs: [(&str, String); 17] = [
            ("-lr", self.lr.to_string()),
            ("-dim", self.dim.to_string()),
            ("-ws", self.ws.to_string()),
            ("-epoch", self.epoch.to_string()),
            ("-minCount", self.min_count.to_string()),
            ("-minCountLabel", self.min_count_label.to_string()),
            ("-minn", self.minn.to_string()),
            ("-maxn", self.maxn.to_string()),
            ("-neg", self.neg.to_string()),
            ("-wordNgrams", self.word_ngrams.to_string()),
            ("-loss", self.loss.to_string()),
            ("-bucket", self.bucket.to_string()),
            ("-thread", self.thread.to_string()),
            ("-lrUpdateRate", self.lr_update_rate.to_string()),
            ("-t", self.t.to_string()),
            ("-label", self.label.clone()),
            ("-verbose", self.verbose.to_string()),
        ];
        pairs
            .into_iter()
            .flat_map(|(flag, value)| [flag.to_string(), value])
            .collect()
    }
}

/// A builder for constructing a validated FastTextConfig with a fluent interface.
///
/// # Example
/// ```
/// use fasttext_estimator::{FastTextConfig, LossName};
///
/// let config = FastTextConfig::builder()
///     .with_epoch(25)
///     .with_word_ngrams(2)
///     .with_loss(LossName::Ova)
///     .build()
///     .unwrap();
/// assert_eq!(config.epoch, 25);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: FastTextConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lr(mut self, lr: f32) -> Self {
        self.config.lr = lr;
        self
    }

    pub fn with_dim(mut self, dim: u32) -> Self {
        self.config.dim = dim;
        self
    }

    pub fn with_ws(mut self, ws: u32) -> Self {
        self.config.ws = ws;
        self
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.config.epoch = epoch;
        self
    }

    pub fn with_min_count(mut self, min_count: u32) -> Self {
        self.config.min_count = min_count;
        self
    }

    pub fn with_min_count_label(mut self, min_count_label: u32) -> Self {
        self.config.min_count_label = min_count_label;
        self
    }

    /// Sets the char ngram bounds; `(0, 0)` disables subwords
    pub fn with_char_ngrams(mut self, minn: u32, maxn: u32) -> Self {
        self.config.minn = minn;
        self.config.maxn = maxn;
        self
    }

    pub fn with_neg(mut self, neg: u32) -> Self {
        self.config.neg = neg;
        self
    }

    pub fn with_word_ngrams(mut self, word_ngrams: u32) -> Self {
        self.config.word_ngrams = word_ngrams;
        self
    }

    pub fn with_loss(mut self, loss: LossName) -> Self {
        self.config.loss = loss;
        self
    }

    pub fn with_bucket(mut self, bucket: u32) -> Self {
        self.config.bucket = bucket;
        self
    }

    pub fn with_thread(mut self, thread: u32) -> Self {
        self.config.thread = thread;
        self
    }

    pub fn with_lr_update_rate(mut self, lr_update_rate: u32) -> Self {
        self.config.lr_update_rate = lr_update_rate;
        self
    }

    pub fn with_t(mut self, t: f32) -> Self {
        self.config.t = t;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Validates and returns the config
    pub fn build(self) -> Result<FastTextConfig, ClassifierError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = FastTextConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.label, "__label__");
        assert_eq!(config.thread, 12);
        assert_eq!(config.loss, LossName::Softmax);
    }

    #[test]
    fn test_builder_validation() {
        assert!(FastTextConfig::builder().with_lr(0.0).build().is_err());
        assert!(FastTextConfig::builder().with_dim(0).build().is_err());
        assert!(FastTextConfig::builder().with_char_ngrams(6, 3).build().is_err());
        assert!(FastTextConfig::builder().with_char_ngrams(3, 6).build().is_ok());
        assert!(FastTextConfig::builder().with_label("").build().is_err());
        assert!(FastTextConfig::builder().with_label("__ label").build().is_err());
        assert!(FastTextConfig::builder().with_verbose(3).build().is_err());
        assert!(FastTextConfig::builder()
            .with_bucket(0)
            .with_word_ngrams(2)
            .build()
            .is_err());
        assert!(FastTextConfig::builder().with_bucket(0).build().is_ok());
    }

    #[test]
    fn test_to_args() {
        let config = FastTextConfig::builder()
            .with_epoch(7)
            .with_loss(LossName::Hs)
            .build()
            .unwrap();
        let args = config.to_args();
        assert_eq!(args.len(), 34);
        let epoch = args.iter().position(|a| a == "-epoch").unwrap();
        assert_eq!(args[epoch + 1], "7");
        let loss = args.iter().position(|a| a == "-loss").unwrap();
        assert_eq!(args[loss + 1], "hs");
        let label = args.iter().position(|a| a == "-label").unwrap();
        assert_eq!(args[label + 1], "__label__");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"epoch": 20, "loss": "ova", "thread": 2}}"#).unwrap();

        let config = FastTextConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.epoch, 20);
        assert_eq!(config.loss, LossName::Ova);
        assert_eq!(config.thread, 2);
        assert_eq!(config.dim, 100);
    }

    #[test]
    fn test_from_json_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"thread": 0}}"#).unwrap();

        let result = FastTextConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }
}
