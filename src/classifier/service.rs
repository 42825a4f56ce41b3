//! The intent service: the public entry point of the classifier.
//!
//! [`IntentService`] owns the model, the vocabulary, the cache, the
//! learning store and the training flag. Classification reads an `Arc`
//! snapshot of the current model; training builds a new one on a blocking
//! thread and swaps it in only after it has been saved.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::analysis::{BagOfWordsEncoder, Vocabulary};
use crate::classifier::cache::{CacheStats, ResponseCache};
use crate::classifier::fallback::FallbackResponder;
use crate::classifier::learning::{LearningOutcome, LearningRejection, LearningStore};
use crate::classifier::policy::{ClassificationOutcome, ClassificationPolicy, Decision};
use crate::classifier::stats::{ModelStats, PerformanceStats};
use crate::clock::{Clock, SystemClock};
use crate::config::ParleyConfig;
use crate::error::{ModelError, ParleyError, Result};
use crate::intent::{ClassificationResult, IntentDataset, IntentRecord};
use crate::ml::{FullRetrainer, IntentNetwork, TrainedModel, Trainer, TrainingMetrics, argmax};
use crate::persistence::{ModelMetadata, ModelStore, PersistedModel};
use crate::relevance::RelevanceScorer;
use crate::safety::ContentFilter;
use crate::storage::{MemoryStorage, Storage};

/// Result of a `train_model` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrainingOutcome {
    /// A new model was trained, saved and installed.
    Trained(TrainingMetrics),
    /// Another training run was in flight; nothing was done.
    AlreadyRunning,
}

/// An installed model.
#[derive(Debug)]
struct ModelState {
    network: IntentNetwork,
    vocabulary: Vocabulary,
    intents: Vec<IntentRecord>,
}

/// Holds the training flag for the lifetime of a run.
struct TrainingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> TrainingGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TrainingGuard { flag })
    }
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Builder for [`IntentService`].
///
/// # Example
///
/// ```
/// use parley::classifier::IntentServiceBuilder;
/// use parley::intent::{IntentDataset, IntentRecord};
///
/// # fn main() -> parley::error::Result<()> {
/// let dataset = IntentDataset::new(vec![IntentRecord::new(
///     "greeting",
///     vec!["hello"],
///     vec!["Hi!"],
/// )]);
/// let service = IntentServiceBuilder::new(dataset).rng_seed(7).build()?;
/// assert!(!service.is_model_ready());
/// # Ok(())
/// # }
/// ```
pub struct IntentServiceBuilder {
    dataset: IntentDataset,
    config: ParleyConfig,
    storage: Option<Arc<dyn Storage>>,
    trainer: Option<Arc<dyn Trainer>>,
    clock: Option<Arc<dyn Clock>>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl IntentServiceBuilder {
    /// Create a new builder over the static intents.
    pub fn new(dataset: IntentDataset) -> Self {
        Self {
            dataset,
            config: ParleyConfig::default(),
            storage: None,
            trainer: None,
            clock: None,
            rng: None,
        }
    }

    pub fn config(mut self, config: ParleyConfig) -> Self {
        self.config = config;
        self
    }

    /// Durable store for the model and learned examples (default: memory).
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Training strategy (default: [`FullRetrainer`] over `config.model`).
    pub fn trainer(mut self, trainer: Arc<dyn Trainer>) -> Self {
        self.trainer = Some(trainer);
        self
    }

    /// Time source for rate limiting and dedup (default: wall clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Random source for response selection (default: OS-seeded).
    pub fn rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Seed response selection deterministically.
    pub fn rng_seed(self, seed: u64) -> Self {
        self.rng(Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn build(self) -> Result<IntentService> {
        self.config.validate()?;
        self.dataset.validate()?;

        let config = self.config;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new_default()));
        let trainer = self
            .trainer
            .unwrap_or_else(|| Arc::new(FullRetrainer::new(config.model.clone())));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(StdRng::from_os_rng()));

        Ok(IntentService {
            base_intents: self.dataset.intents,
            encoder: BagOfWordsEncoder::new(),
            scorer: RelevanceScorer::new(&config.lexicon, config.relevance.clone()),
            safety: ContentFilter::new(&config.lexicon),
            fallback: FallbackResponder::new(config.fallback.clone()),
            trainer,
            store: ModelStore::new(storage),
            clock,
            policy: RwLock::new(ClassificationPolicy::new(config.policy.clone())),
            state: RwLock::new(None),
            metrics: RwLock::new(TrainingMetrics::default()),
            cache: Mutex::new(ResponseCache::new(config.cache.max_size)),
            learning: Mutex::new(LearningStore::new(
                config.learning.clone(),
                &config.lexicon,
                config.policy.learned_prefix.clone(),
            )),
            rng: Mutex::new(rng),
            training: AtomicBool::new(false),
            inference_calls: AtomicU64::new(0),
            training_runs: AtomicU64::new(0),
            config,
        })
    }
}

/// Intent classification with a confidence policy, caching, runtime
/// learning and persistence.
pub struct IntentService {
    config: ParleyConfig,
    base_intents: Vec<IntentRecord>,
    encoder: BagOfWordsEncoder,
    scorer: RelevanceScorer,
    safety: ContentFilter,
    fallback: FallbackResponder,
    trainer: Arc<dyn Trainer>,
    store: ModelStore,
    clock: Arc<dyn Clock>,
    policy: RwLock<ClassificationPolicy>,
    state: RwLock<Option<Arc<ModelState>>>,
    metrics: RwLock<TrainingMetrics>,
    cache: Mutex<ResponseCache>,
    learning: Mutex<LearningStore>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    training: AtomicBool,
    inference_calls: AtomicU64,
    training_runs: AtomicU64,
}

impl std::fmt::Debug for IntentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentService")
            .field("intents", &self.base_intents.len())
            .field("trainer", &self.trainer.name())
            .field("model_ready", &self.is_model_ready())
            .finish()
    }
}

impl IntentService {
    /// Start building a service over the static intents.
    pub fn builder(dataset: IntentDataset) -> IntentServiceBuilder {
        IntentServiceBuilder::new(dataset)
    }

    pub fn config(&self) -> &ParleyConfig {
        &self.config
    }

    /// Restore the saved model and learned examples.
    ///
    /// Returns `false` when no valid model is saved; the caller should then
    /// call [`train_model`](Self::train_model).
    ///
    /// When a model is loaded, its learned intents are the learned
    /// collection; the separately saved collection is only used without a
    /// model and is rewritten if it disagrees.
    pub fn load_model(&self) -> Result<bool> {
        let saved = self.store.load_learned()?;
        let persisted = self.store.load()?;

        let learned = match &persisted {
            Some(model) => {
                let prefix = &self.config.policy.learned_prefix;
                let from_model: Vec<IntentRecord> = model
                    .metadata
                    .intents
                    .iter()
                    .filter(|intent| intent.tag.starts_with(prefix.as_str()))
                    .cloned()
                    .collect();
                if from_model != saved.intents {
                    warn!(
                        "Learned examples on disk ({}) disagree with the saved model ({}); using the model",
                        saved.len(),
                        from_model.len()
                    );
                    let rewritten = IntentDataset::new(from_model.clone());
                    if let Err(e) = self.store.save_learned(&rewritten) {
                        warn!("Failed to rewrite learned examples: {e}");
                    }
                }
                from_model
            }
            None => saved.intents,
        };
        if !learned.is_empty() {
            info!("Restored {} learned examples", learned.len());
        }
        self.learning.lock().restore(learned);

        match persisted {
            Some(persisted) => {
                let intent_count = persisted.metadata.intents.len();
                self.install(persisted);
                info!("Model loaded with {intent_count} intents");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Train on the static and learned intents, save, and install.
    ///
    /// Returns [`TrainingOutcome::AlreadyRunning`] without doing anything
    /// when another run holds the training flag.
    pub async fn train_model(&self) -> Result<TrainingOutcome> {
        let Some(_guard) = TrainingGuard::try_acquire(&self.training) else {
            info!("Training already in progress; skipping");
            return Ok(TrainingOutcome::AlreadyRunning);
        };

        let intents = self.training_intents();
        let metrics = self
            .retrain(intents, self.config.persistence.require_save)
            .await?;
        Ok(TrainingOutcome::Trained(metrics))
    }

    /// Classify `text`, returning `None` when the caller should defer to
    /// the external AI.
    pub async fn classify_input(&self, text: &str) -> Result<Option<ClassificationResult>> {
        Ok(self.classify_detailed(text).await?.into_result())
    }

    /// Classify `text` and report which rule decided the outcome.
    pub async fn classify_detailed(&self, text: &str) -> Result<ClassificationOutcome> {
        // Read before the model and policy: a clear in between makes the
        // result of this call uncacheable.
        let epoch = self.cache.lock().epoch();
        let state = self.current_state().ok_or_else(|| ModelError::ModelNotTrained {
            message: "call load_model or train_model first".to_string(),
        })?;

        let key = ResponseCache::key(text);
        if let Some(hit) = self.cache.lock().get(&key) {
            debug!("Cache hit for \"{key}\"");
            return Ok(ClassificationOutcome::Cached(hit));
        }

        let verdict = self.safety.check(text);
        if verdict.is_inappropriate {
            debug!("Refused ({}) \"{key}\"", verdict.kind);
            return Ok(ClassificationOutcome::Refused { kind: verdict.kind });
        }

        let signal = self.scorer.analyze(text);
        let policy = self.policy.read().clone();
        if !policy.passes_relevance(signal.score) {
            debug!("Off topic ({:.2}) \"{key}\"", signal.score);
            return Ok(ClassificationOutcome::OffTopic {
                relevance: signal.score,
            });
        }

        let input = self.encoder.encode(text, &state.vocabulary);
        let probabilities = state.network.predict(&input)?;
        self.inference_calls.fetch_add(1, Ordering::Relaxed);

        let (best, confidence) = argmax(&probabilities).ok_or_else(|| {
            ParleyError::from(ModelError::ModelNotTrained {
                message: "model has no output classes".to_string(),
            })
        })?;
        let intent = state.intents.get(best).ok_or(ModelError::ShapeMismatch {
            expected: state.intents.len(),
            actual: probabilities.len(),
        })?;

        match policy.decide(&signal, confidence) {
            Decision::Accept => {
                let response = {
                    let mut rng = self.rng.lock();
                    let idx = rng.random_range(0..intent.responses.len());
                    intent.responses[idx].clone()
                };
                let result = ClassificationResult {
                    tag: intent.tag.clone(),
                    confidence,
                    response,
                    relevance: signal.score,
                    source: policy.source_for(&intent.tag),
                };
                debug!(
                    "Matched {} ({:.2}) for \"{key}\"",
                    result.tag, result.confidence
                );
                if !self.cache.lock().put_if_current(key, result.clone(), epoch) {
                    debug!("Model or thresholds changed during classification; not cached");
                }
                Ok(ClassificationOutcome::Matched(result))
            }
            Decision::DeferGeneric { .. } => {
                info!(
                    "Generic question deferred to external AI (relevance {:.2}): \"{key}\"",
                    signal.score
                );
                Ok(ClassificationOutcome::DeferredGeneric {
                    tag: intent.tag.clone(),
                    confidence,
                    relevance: signal.score,
                })
            }
            Decision::LowConfidence { threshold } => {
                debug!(
                    "Low confidence {:.2} < {:.2} for {} on \"{key}\"",
                    confidence, threshold, intent.tag
                );
                Ok(ClassificationOutcome::LowConfidence {
                    tag: intent.tag.clone(),
                    confidence,
                    threshold,
                })
            }
        }
    }

    /// Rule-based answer for inputs the model deferred. Never runs the
    /// model.
    pub fn generate_fallback(&self, text: &str) -> Option<ClassificationResult> {
        if self.safety.check(text).is_inappropriate {
            return None;
        }
        let signal = self.scorer.analyze(text);
        let mut rng = self.rng.lock();
        self.fallback.respond(text, &signal, &mut *rng)
    }

    /// Learn an externally produced answer as a new intent.
    ///
    /// Rejections and training failures are reported in the outcome; the
    /// learned collection is left unchanged unless the example was learned.
    pub async fn add_learning_example(&self, input: &str, response: &str) -> LearningOutcome {
        let now = self.clock.now();
        let screened = self.learning.lock().screen(input, response, now);
        let example = match screened {
            Ok(example) => example,
            Err(rejection) => {
                warn!("Learning example rejected: {rejection}");
                return rejection.into();
            }
        };

        let Some(_guard) = TrainingGuard::try_acquire(&self.training) else {
            warn!("Learning example rejected: training already in progress");
            return LearningRejection::TrainingInProgress.into();
        };

        let (tag, updated) = {
            let mut learning = self.learning.lock();
            let tag = learning.stage(&example, now);
            (tag, learning.to_dataset())
        };

        match self.retrain_and_persist(&updated).await {
            Ok(_) => {
                self.learning.lock().commit(&example, now);
                info!("Learned {tag}: \"{}\"", example.input);
                LearningOutcome::learned(tag)
            }
            Err(e) => {
                self.learning.lock().rollback(&tag);
                warn!("Learning example rolled back: {e}");
                LearningRejection::TrainingFailed(e.to_string()).into()
            }
        }
    }

    /// The learned collection is written only after the model that contains
    /// it has been saved.
    async fn retrain_and_persist(&self, learned: &IntentDataset) -> Result<TrainingMetrics> {
        let mut intents = self.base_intents.clone();
        intents.extend(learned.intents.iter().cloned());
        let metrics = self.retrain(intents, true).await?;
        if let Err(e) = self.store.save_learned(learned) {
            // The saved model carries the learned intents; load_model
            // rebuilds the collection from it.
            warn!("Model saved but learned examples were not: {e}");
        }
        Ok(metrics)
    }

    /// Train off the async runtime, check the model's shapes, save, then
    /// install. The caller holds the training flag.
    async fn retrain(
        &self,
        intents: Vec<IntentRecord>,
        require_save: bool,
    ) -> Result<TrainingMetrics> {
        let trainer = Arc::clone(&self.trainer);
        let store = self.store.clone();
        let clock = Arc::clone(&self.clock);

        let (persisted, saved) = tokio::task::spawn_blocking(move || {
            let TrainedModel {
                network,
                vocabulary,
                intents,
                metrics,
            } = trainer.train(&intents)?;
            let persisted = PersistedModel {
                network,
                metadata: ModelMetadata {
                    vocabulary,
                    intents,
                    saved_at: clock.now(),
                    metrics,
                },
            };
            persisted.validate()?;
            let saved = store.save(&persisted);
            Ok::<_, ParleyError>((persisted, saved))
        })
        .await
        .map_err(|e| ParleyError::training(format!("training task failed: {e}")))??;

        match saved {
            Ok(generation) => debug!("Installed model generation {generation}"),
            Err(e) if require_save => {
                warn!("Model trained but not saved: {e}");
                return Err(e);
            }
            Err(e) => warn!("Model trained but not saved, keeping it in memory only: {e}"),
        }

        let metrics = persisted.metadata.metrics.clone();
        self.install(persisted);
        self.training_runs.fetch_add(1, Ordering::Relaxed);
        Ok(metrics)
    }

    fn install(&self, persisted: PersistedModel) {
        let PersistedModel { network, metadata } = persisted;
        let state = ModelState {
            network,
            vocabulary: metadata.vocabulary,
            intents: metadata.intents,
        };
        *self.state.write() = Some(Arc::new(state));
        *self.metrics.write() = metadata.metrics;
        self.cache.lock().clear();
    }

    fn current_state(&self) -> Option<Arc<ModelState>> {
        self.state.read().clone()
    }

    fn training_intents(&self) -> Vec<IntentRecord> {
        let mut intents = self.base_intents.clone();
        intents.extend(self.learning.lock().learned().iter().cloned());
        intents
    }

    pub fn is_model_ready(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn is_training(&self) -> bool {
        self.training.load(Ordering::Acquire)
    }

    /// Clamp into `[0.1, 1.0]`, store, clear the cache and return the value
    /// in effect.
    pub fn update_confidence_threshold(&self, threshold: f32) -> f32 {
        let value = self.policy.write().set_confidence_threshold(threshold);
        self.cache.lock().clear();
        info!("Confidence threshold set to {value:.2}");
        value
    }

    /// Clamp into `[0.1, 1.0]`, store, clear the cache and return the value
    /// in effect.
    pub fn update_relevance_threshold(&self, threshold: f32) -> f32 {
        let value = self.policy.write().set_relevance_threshold(threshold);
        self.cache.lock().clear();
        info!("Relevance threshold set to {value:.2}");
        value
    }

    pub fn relevance(&self, text: &str) -> f32 {
        self.scorer.score(text)
    }

    pub fn learned_intents(&self) -> Vec<IntentRecord> {
        self.learning.lock().learned().to_vec()
    }

    pub fn model_stats(&self) -> ModelStats {
        let state = self.current_state();
        let policy = self.policy.read();
        ModelStats {
            is_ready: state.is_some(),
            vocabulary_size: state.as_ref().map(|s| s.vocabulary.len()).unwrap_or(0),
            intent_count: state.as_ref().map(|s| s.intents.len()).unwrap_or(0),
            learned_intents: self.learning.lock().len(),
            parameter_count: state
                .as_ref()
                .map(|s| s.network.parameter_count())
                .unwrap_or(0),
            confidence_threshold: policy.confidence_threshold(),
            relevance_threshold: policy.relevance_threshold(),
            trainer: self.trainer.name().to_string(),
        }
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        PerformanceStats {
            model_ready: self.is_model_ready(),
            is_training: self.is_training(),
            inference_calls: self.inference_calls.load(Ordering::Relaxed),
            training_runs: self.training_runs.load(Ordering::Relaxed),
            cache: self.cache_stats(),
            last_training: self.training_metrics(),
        }
    }

    pub fn training_metrics(&self) -> TrainingMetrics {
        self.metrics.read().clone()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Drop the model, the cache and the last metrics. Safe to call any
    /// number of times.
    pub fn cleanup(&self) {
        *self.state.write() = None;
        *self.metrics.write() = TrainingMetrics::default();
        self.cache.lock().clear();
        debug!("Classifier resources released");
    }
}
