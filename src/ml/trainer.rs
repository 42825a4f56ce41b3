//! Training: dataset preparation, the epoch loop and early stopping.

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::analysis::{BagOfWordsEncoder, Vocabulary};
use crate::config::ModelConfig;
use crate::error::{ParleyError, Result};
use crate::intent::IntentRecord;
use crate::ml::network::{Gradients, IntentNetwork, argmax};
use crate::ml::optimizer::Adam;

/// Statistics of the most recent training run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub epochs: usize,
    pub final_loss: f32,
    pub final_accuracy: f32,
    pub validation_loss: Option<f32>,
    pub validation_accuracy: Option<f32>,
    pub early_stopped: bool,
    pub training_examples: usize,
    pub validation_examples: usize,
}

impl TrainingMetrics {
    /// Wall time of the run in milliseconds.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}

/// Encoded examples with their intent indices.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub inputs: Vec<Vec<f32>>,
    pub labels: Vec<usize>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn push(&mut self, input: Vec<f32>, label: usize) {
        self.inputs.push(input);
        self.labels.push(label);
    }

    /// Mean cross-entropy and accuracy in inference mode.
    pub fn evaluate(&self, network: &IntentNetwork) -> Result<(f32, f32)> {
        if self.is_empty() {
            return Ok((0.0, 0.0));
        }
        let mut loss = 0.0;
        let mut correct = 0;
        for (input, &label) in self.inputs.iter().zip(&self.labels) {
            let probabilities = network.predict(input)?;
            loss -= probabilities[label].max(1e-7).ln();
            if argmax(&probabilities).map(|(i, _)| i) == Some(label) {
                correct += 1;
            }
        }
        let n = self.len() as f32;
        Ok((loss / n, correct as f32 / n))
    }
}

/// Output of a successful training run.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub network: IntentNetwork,
    pub vocabulary: Vocabulary,
    pub intents: Vec<IntentRecord>,
    pub metrics: TrainingMetrics,
}

/// Trait for strategies that turn intents into a trained model.
pub trait Trainer: Send + Sync + Debug {
    /// Train a new model on `intents`. Never mutates an existing model.
    fn train(&self, intents: &[IntentRecord]) -> Result<TrainedModel>;

    /// Get the name of this trainer.
    fn name(&self) -> &str;
}

/// Rebuilds the vocabulary and trains a fresh network from scratch.
#[derive(Debug, Clone, Default)]
pub struct FullRetrainer {
    config: ModelConfig,
    encoder: BagOfWordsEncoder,
}

impl FullRetrainer {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            encoder: BagOfWordsEncoder::new(),
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Split every intent's patterns into training and validation examples.
    ///
    /// An intent's last pattern always stays in the training set, so every
    /// intent is learned even with a single example.
    pub fn split(
        &self,
        intents: &[IntentRecord],
        vocabulary: &Vocabulary,
        rng: &mut StdRng,
    ) -> (TrainingSet, TrainingSet) {
        let mut train = TrainingSet::default();
        let mut validation = TrainingSet::default();

        for (label, intent) in intents.iter().enumerate() {
            let mut order: Vec<usize> = (0..intent.patterns.len()).collect();
            order.shuffle(rng);

            let held = ((order.len() as f32) * self.config.validation_split).floor() as usize;
            let held = held.min(order.len().saturating_sub(1));

            for (position, &pattern_idx) in order.iter().enumerate() {
                let input = self.encoder.encode(&intent.patterns[pattern_idx], vocabulary);
                if position < held {
                    validation.push(input, label);
                } else {
                    train.push(input, label);
                }
            }
        }

        (train, validation)
    }
}

impl Trainer for FullRetrainer {
    fn train(&self, intents: &[IntentRecord]) -> Result<TrainedModel> {
        if intents.is_empty() {
            return Err(ParleyError::configuration("no training data"));
        }
        for intent in intents {
            intent.validate()?;
        }

        let vocabulary = Vocabulary::build(intents);
        if vocabulary.is_empty() {
            return Err(ParleyError::configuration(
                "no training data: patterns contain no words",
            ));
        }

        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut metrics = TrainingMetrics {
            start_time: Some(Utc::now()),
            ..Default::default()
        };

        let (train, validation) = self.split(intents, &vocabulary, &mut rng);
        metrics.training_examples = train.len();
        metrics.validation_examples = validation.len();

        info!(
            "Training on {} examples ({} held out) across {} intents, vocabulary {}",
            train.len(),
            validation.len(),
            intents.len(),
            vocabulary.len()
        );

        let mut network = IntentNetwork::new(
            vocabulary.len(),
            &config.hidden_layers,
            intents.len(),
            &mut rng,
        )?;
        let mut optimizer = Adam::new(config.learning_rate);
        let mut grads = Gradients::zeros_like(&network);
        let mut order: Vec<usize> = (0..train.len()).collect();

        let mut best_loss = f32::INFINITY;
        let mut stale_epochs = 0;

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(config.batch_size) {
                grads.clear();
                for &i in batch {
                    let trace = network.forward_train(&train.inputs[i], &mut rng);
                    network.backward(&trace, train.labels[i], &mut grads);
                }
                optimizer.step(&mut network, &grads, batch.len());
            }

            let (loss, accuracy) = train.evaluate(&network)?;
            if !loss.is_finite() {
                return Err(ParleyError::training(format!(
                    "loss diverged at epoch {}",
                    epoch + 1
                )));
            }
            metrics.epochs = epoch + 1;
            metrics.final_loss = loss;
            metrics.final_accuracy = accuracy;

            if epoch % 10 == 0 {
                debug!("Epoch {}: loss = {:.4}, accuracy = {:.3}", epoch + 1, loss, accuracy);
            }

            if loss < best_loss - config.min_delta {
                best_loss = loss;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
                if stale_epochs >= config.patience {
                    metrics.early_stopped = true;
                    debug!("Early stopping at epoch {}", epoch + 1);
                    break;
                }
            }
        }

        if !validation.is_empty() {
            let (loss, accuracy) = validation.evaluate(&network)?;
            metrics.validation_loss = Some(loss);
            metrics.validation_accuracy = Some(accuracy);
        }
        metrics.end_time = Some(Utc::now());

        info!(
            "Training finished after {} epochs: loss = {:.4}, accuracy = {:.3}",
            metrics.epochs, metrics.final_loss, metrics.final_accuracy
        );

        Ok(TrainedModel {
            network,
            vocabulary,
            intents: intents.to_vec(),
            metrics,
        })
    }

    fn name(&self) -> &str {
        "full_retrain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HiddenLayerConfig;

    fn quick_config() -> ModelConfig {
        ModelConfig {
            hidden_layers: vec![
                HiddenLayerConfig::new(32, 0.1, 0.001),
                HiddenLayerConfig::new(16, 0.1, 0.0),
            ],
            learning_rate: 0.01,
            epochs: 150,
            ..ModelConfig::default()
        }
    }

    fn intents() -> Vec<IntentRecord> {
        vec![
            IntentRecord::new("greeting", vec!["hello", "hi there", "hey"], vec!["Hi!"]),
            IntentRecord::new(
                "pricing",
                vec!["how much does it cost", "what are your rates", "price list"],
                vec!["It depends."],
            ),
            IntentRecord::new(
                "stack",
                vec!["which languages do you use", "do you know react"],
                vec!["Mostly TypeScript."],
            ),
        ]
    }

    #[test]
    fn test_rejects_empty_data() {
        let trainer = FullRetrainer::new(quick_config());
        let err = trainer.train(&[]).unwrap_err();
        assert!(matches!(err, ParleyError::Configuration(_)));

        let wordless = vec![IntentRecord::new("x", vec!["?!"], vec!["y"])];
        assert!(trainer.train(&wordless).is_err());
    }

    #[test]
    fn test_split_keeps_last_pattern_per_intent() {
        let trainer = FullRetrainer::new(ModelConfig {
            validation_split: 0.5,
            ..quick_config()
        });
        let intents = vec![
            IntentRecord::new("single", vec!["only one"], vec!["a"]),
            IntentRecord::new("four", vec!["a b", "c d", "e f", "g h"], vec!["b"]),
        ];
        let vocabulary = Vocabulary::build(&intents);
        let mut rng = StdRng::seed_from_u64(1);
        let (train, validation) = trainer.split(&intents, &vocabulary, &mut rng);

        assert_eq!(train.labels.iter().filter(|&&l| l == 0).count(), 1);
        assert_eq!(validation.labels.iter().filter(|&&l| l == 0).count(), 0);
        assert_eq!(train.labels.iter().filter(|&&l| l == 1).count(), 2);
        assert_eq!(validation.labels.iter().filter(|&&l| l == 1).count(), 2);
    }

    #[test]
    fn test_training_fits_its_own_data() {
        let trainer = FullRetrainer::new(quick_config());
        let model = trainer.train(&intents()).unwrap();
        let encoder = BagOfWordsEncoder::new();

        let probabilities = model
            .network
            .predict(&encoder.encode("hello", &model.vocabulary))
            .unwrap();
        let (best, confidence) = argmax(&probabilities).unwrap();
        assert_eq!(model.intents[best].tag, "greeting");
        assert!(confidence > 0.75, "{confidence}");

        assert!(model.metrics.epochs > 0);
        assert!(model.metrics.start_time <= model.metrics.end_time);
        assert!(model.metrics.final_accuracy > 0.99);
    }

    #[test]
    fn test_training_is_deterministic() {
        let trainer = FullRetrainer::new(quick_config());
        let a = trainer.train(&intents()).unwrap();
        let b = trainer.train(&intents()).unwrap();
        assert_eq!(a.network, b.network);
        assert_eq!(a.vocabulary, b.vocabulary);
        assert_eq!(a.metrics.epochs, b.metrics.epochs);
    }

    #[test]
    fn test_metrics_duration() {
        let metrics = TrainingMetrics::default();
        assert_eq!(metrics.duration_ms(), None);
    }
}
