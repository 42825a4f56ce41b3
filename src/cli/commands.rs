//! Command implementations for the parley CLI.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::classifier::{IntentService, TrainingOutcome};
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::ParleyConfig;
use crate::intent::IntentDataset;
use crate::storage::{FileStorage, StorageConfig};

/// Execute a CLI command.
pub async fn execute_command(args: ParleyArgs) -> Result<()> {
    let service = open_service(&args.service)?;
    match &args.command {
        Command::Train(train_args) => train(&service, train_args, &args).await,
        Command::Classify(classify_args) => classify(&service, classify_args, &args).await,
        Command::Learn(learn_args) => learn(&service, learn_args, &args).await,
        Command::Fallback(fallback_args) => fallback(&service, fallback_args, &args),
        Command::Stats => stats(&service, &args),
    }
}

/// Build the service over the on-disk store and restore saved state.
fn open_service(args: &ServiceArgs) -> Result<IntentService> {
    let config = match &args.config {
        Some(path) => ParleyConfig::from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ParleyConfig::default(),
    };
    let dataset = IntentDataset::from_path(&args.dataset)
        .with_context(|| format!("failed to load dataset from {}", args.dataset.display()))?;
    let storage = FileStorage::new(&args.store, StorageConfig::default())
        .with_context(|| format!("failed to open store at {}", args.store.display()))?;

    let mut builder = IntentService::builder(dataset)
        .config(config)
        .storage(Arc::new(storage));
    if let Some(seed) = args.seed {
        builder = builder.rng_seed(seed);
    }
    let service = builder.build()?;
    service.load_model()?;
    Ok(service)
}

async fn ensure_model(service: &IntentService) -> Result<()> {
    if !service.is_model_ready() {
        info!("No saved model; training one");
        service.train_model().await?;
    }
    Ok(())
}

async fn train(service: &IntentService, args: &TrainArgs, cli_args: &ParleyArgs) -> Result<()> {
    if service.is_model_ready() && !args.force {
        let report = TrainReport {
            loaded: true,
            metrics: service.training_metrics(),
        };
        return Ok(output_result("Loaded saved model", &report, cli_args)?);
    }

    let metrics = match service.train_model().await? {
        TrainingOutcome::Trained(metrics) => metrics,
        TrainingOutcome::AlreadyRunning => anyhow::bail!("training already in progress"),
    };
    let report = TrainReport {
        loaded: false,
        metrics,
    };
    Ok(output_result("Model trained", &report, cli_args)?)
}

async fn classify(
    service: &IntentService,
    args: &ClassifyArgs,
    cli_args: &ParleyArgs,
) -> Result<()> {
    ensure_model(service).await?;
    if let Some(threshold) = args.confidence_threshold {
        service.update_confidence_threshold(threshold);
    }
    if let Some(threshold) = args.relevance_threshold {
        service.update_relevance_threshold(threshold);
    }

    for input in &args.inputs {
        let outcome = service.classify_detailed(input).await?;
        let fallback = if args.with_fallback && !outcome.is_answered() {
            service.generate_fallback(input)
        } else {
            None
        };
        let report = ClassifyReport {
            input: input.clone(),
            outcome,
            fallback,
        };
        output_result(input, &report, cli_args)?;
    }
    Ok(())
}

async fn learn(service: &IntentService, args: &LearnArgs, cli_args: &ParleyArgs) -> Result<()> {
    ensure_model(service).await?;
    let outcome = service
        .add_learning_example(&args.input, &args.response)
        .await;
    let message = if outcome.success {
        "Example learned"
    } else {
        "Example rejected"
    };
    let report = LearnReport {
        input: args.input.clone(),
        outcome,
    };
    Ok(output_result(message, &report, cli_args)?)
}

fn fallback(service: &IntentService, args: &FallbackArgs, cli_args: &ParleyArgs) -> Result<()> {
    match service.generate_fallback(&args.text) {
        Some(result) => Ok(output_result("Fallback answer", &result, cli_args)?),
        None => {
            if cli_args.verbosity() > 0 {
                println!("No fallback answer; defer to the external AI");
            }
            Ok(())
        }
    }
}

fn stats(service: &IntentService, cli_args: &ParleyArgs) -> Result<()> {
    let report = StatsReport {
        model: service.model_stats(),
        performance: service.performance_stats(),
    };
    Ok(output_result("Statistics", &report, cli_args)?)
}
