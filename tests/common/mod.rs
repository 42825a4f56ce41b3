#![allow(dead_code)]

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use parley::analysis::Vocabulary;
use parley::classifier::{IntentService, IntentServiceBuilder};
use parley::config::{HiddenLayerConfig, ParleyConfig};
use parley::error::Result;
use parley::intent::{IntentDataset, IntentRecord};
use parley::ml::{IntentNetwork, TrainedModel, Trainer, TrainingMetrics};

pub const PORTFOLIO: &str = include_str!("../../data/portfolio_intents.json");

pub fn portfolio() -> IntentDataset {
    IntentDataset::from_json_str(PORTFOLIO).expect("bundled dataset should be valid")
}

/// Small network, every pattern trained.
pub fn test_config() -> ParleyConfig {
    let mut config = ParleyConfig::default();
    config.model.hidden_layers = vec![
        HiddenLayerConfig::new(64, 0.1, 0.001),
        HiddenLayerConfig::new(32, 0.0, 0.0),
    ];
    config.model.learning_rate = 0.01;
    config.model.epochs = 200;
    config.model.patience = 20;
    config.model.validation_split = 0.0;
    config
}

pub fn builder() -> IntentServiceBuilder {
    IntentService::builder(portfolio())
        .config(test_config())
        .rng_seed(11)
}

pub async fn trained_service() -> Result<Arc<IntentService>> {
    let service = builder().build()?;
    service.train_model().await?;
    Ok(Arc::new(service))
}

/// Builds an untrained network over a one-word vocabulary no real input
/// contains. Every input encodes to zeros, so every intent scores exactly
/// `1 / intents.len()`.
#[derive(Debug)]
pub struct IndifferentTrainer;

impl Trainer for IndifferentTrainer {
    fn train(&self, intents: &[IntentRecord]) -> Result<TrainedModel> {
        let vocabulary = Vocabulary::from(vec!["zzqx".to_string()]);
        let mut rng = StdRng::seed_from_u64(3);
        let network = IntentNetwork::new(
            vocabulary.len(),
            &[HiddenLayerConfig::new(4, 0.0, 0.0)],
            intents.len(),
            &mut rng,
        )?;
        Ok(TrainedModel {
            network,
            vocabulary,
            intents: intents.to_vec(),
            metrics: TrainingMetrics::default(),
        })
    }

    fn name(&self) -> &str {
        "indifferent"
    }
}

/// Returns a network with one more output class than there are intents.
#[derive(Debug)]
pub struct MisshapenTrainer;

impl Trainer for MisshapenTrainer {
    fn train(&self, intents: &[IntentRecord]) -> Result<TrainedModel> {
        let vocabulary = Vocabulary::build(intents);
        let mut rng = StdRng::seed_from_u64(5);
        let network = IntentNetwork::new(
            vocabulary.len(),
            &[HiddenLayerConfig::new(4, 0.0, 0.0)],
            intents.len() + 1,
            &mut rng,
        )?;
        Ok(TrainedModel {
            network,
            vocabulary,
            intents: intents.to_vec(),
            metrics: TrainingMetrics::default(),
        })
    }

    fn name(&self) -> &str {
        "misshapen"
    }
}

pub async fn indifferent_service() -> Result<IntentService> {
    let service = builder().trainer(Arc::new(IndifferentTrainer)).build()?;
    service.train_model().await?;
    Ok(service)
}
