use log::info;

use crate::backend::{Backend, FastTextCli};
use crate::classifier::embedding::export_class_embeddings;
use crate::classifier::{
    ClassEmbeddings, ClassifierError, FastTextClassifier, FastTextConfig, ProbabilityTable,
};

/// Default seed kept for callers that split data before fitting
pub const DEFAULT_RANDOM_STATE: u64 = 24;

/// Summary of a model's current state
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model type name
    pub model_type: &'static str,
    pub fitted: bool,
    /// Number of classes the model was fitted on
    pub num_classes: usize,
    /// Sorted class labels
    pub class_labels: Vec<String>,
    /// Size of the class embedding vectors, 0 before fitting
    pub embedding_size: usize,
    pub config: FastTextConfig,
}

/// fastText text classifier with class embeddings.
///
/// Wraps a [`FastTextClassifier`] and, after each fit, exports the per-class
/// output vectors of the trained model into a [`ClassEmbeddings`] table.
pub struct FastTextModel<B: Backend = FastTextCli> {
    /// Model type name
    pub model_type: &'static str,
    random_state: u64,
    estimator: FastTextClassifier<B>,
    class_embeddings: Option<ClassEmbeddings>,
}

// Compile-time verification that the default model can move between threads
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<FastTextModel>();
    }
};

impl FastTextModel<FastTextCli> {
    /// Creates a model driving the `fasttext` executable found via `$FASTTEXT_BIN` or `PATH`
    pub fn with_default_backend(config: FastTextConfig) -> Result<Self, ClassifierError> {
        Self::new(config, FastTextCli::from_env())
    }
}

impl<B: Backend> FastTextModel<B> {
    pub fn new(config: FastTextConfig, backend: B) -> Result<Self, ClassifierError> {
        Ok(Self {
            model_type: "fasttext",
            random_state: DEFAULT_RANDOM_STATE,
            estimator: FastTextClassifier::new(config, backend)?,
            class_embeddings: None,
        })
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn random_state(&self) -> u64 {
        self.random_state
    }

    /// Replaces the hyperparameters; they apply from the next `fit`
    pub fn set_params(&mut self, config: FastTextConfig) -> Result<(), ClassifierError> {
        self.estimator.set_config(config)
    }

    pub fn estimator(&self) -> &FastTextClassifier<B> {
        &self.estimator
    }

    pub fn is_fitted(&self) -> bool {
        self.estimator.is_fitted() && self.class_embeddings.is_some()
    }

    /// Sorted distinct labels seen by the last successful fit
    pub fn classes(&self) -> Option<&[String]> {
        self.estimator.classes()
    }

    pub fn class_embeddings(&self) -> Option<&ClassEmbeddings> {
        self.class_embeddings.as_ref()
    }

    /// Fits the classifier, then exports its class embeddings.
    ///
    /// A failed fit, including a failed export, leaves the model unfitted: any
    /// previous fit is discarded and `predict` returns `NotFittedError`.
    ///
    /// # Errors
    /// - Anything [`FastTextClassifier::fit`] returns
    /// - `BackendError` or `ParseError` if the softmax export fails
    pub fn fit<D, T, L>(&mut self, docs: &[D], labels: &[L]) -> Result<&mut Self, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
        L: AsRef<str>,
    {
        self.class_embeddings = None;
        let exported = match self.estimator.fit(docs, labels) {
            Ok(estimator) => {
                let label_prefix = estimator.config().label.clone();
                estimator
                    .trained_model()
                    .and_then(|model| export_class_embeddings(model, &label_prefix))
            }
            Err(e) => Err(e),
        };
        let embeddings = match exported {
            Ok(embeddings) => embeddings,
            Err(e) => {
                self.estimator.reset();
                return Err(e);
            }
        };
        info!(
            "{} model fitted with {} classes",
            self.model_type,
            embeddings.len()
        );
        self.class_embeddings = Some(embeddings);
        Ok(self)
    }

    pub fn predict<D, T>(&self, docs: &[D]) -> Result<Vec<String>, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        self.estimator.predict(docs)
    }

    pub fn predict_proba<D, T>(&self, docs: &[D]) -> Result<ProbabilityTable, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
    {
        self.estimator.predict_proba(docs)
    }

    pub fn score<D, T, L>(&self, docs: &[D], labels: &[L]) -> Result<f32, ClassifierError>
    where
        D: AsRef<[T]>,
        T: AsRef<str>,
        L: AsRef<str>,
    {
        self.estimator.score(docs, labels)
    }

    /// Returns information about the model's current state
    pub fn info(&self) -> ModelInfo {
        let class_labels = self.classes().map(<[String]>::to_vec).unwrap_or_default();
        ModelInfo {
            model_type: self.model_type,
            fitted: self.is_fitted(),
            num_classes: class_labels.len(),
            class_labels,
            embedding_size: self.class_embeddings.as_ref().map_or(0, ClassEmbeddings::dim),
            config: self.estimator.config().clone(),
        }
    }
}
