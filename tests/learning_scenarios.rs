mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use parley::classifier::{ClassificationOutcome, TrainingOutcome};
use parley::clock::ManualClock;
use parley::error::Result;
use parley::intent::{IntentDataset, IntentRecord, ResponseSource};
use parley::storage::{MemoryStorage, Storage};

use common::builder;

const RUST_ANSWER: &str = "Yes, I have some Rust experience.";

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    ))
}

#[tokio::test]
async fn learned_answer_is_served_after_retraining() -> Result<()> {
    let clock = clock();
    let service = builder().clock(clock.clone()).build()?;
    service.train_model().await?;
    let runs = service.performance_stats().training_runs;

    let outcome = service
        .add_learning_example("do you know Rust?", RUST_ANSWER)
        .await;
    assert!(outcome.success, "{:?}", outcome.reason);
    let tag = outcome.tag.expect("learned tag");
    assert!(tag.starts_with("learned_"));
    assert_eq!(service.performance_stats().training_runs, runs + 1);
    assert_eq!(service.learned_intents().len(), 1);
    assert_eq!(service.model_stats().learned_intents, 1);

    service.clear_cache();
    let result = service
        .classify_input("do you know Rust?")
        .await?
        .expect("learned answer");
    assert_eq!(result.tag, tag);
    assert_eq!(result.source, ResponseSource::Learned);
    assert_eq!(result.response, RUST_ANSWER);
    Ok(())
}

#[tokio::test]
async fn rapid_repeat_is_rejected() -> Result<()> {
    let clock = clock();
    let service = builder().clock(clock.clone()).build()?;
    service.train_model().await?;

    assert!(
        service
            .add_learning_example("do you know Rust?", RUST_ANSWER)
            .await
            .success
    );

    let second = service
        .add_learning_example("do you know Rust?", RUST_ANSWER)
        .await;
    assert!(!second.success);
    assert_eq!(second.reason.as_deref(), Some("Rate limit exceeded"));

    clock.advance(Duration::seconds(2));
    let third = service
        .add_learning_example("Do you know rust", "Still yes.")
        .await;
    assert!(!third.success);
    assert_eq!(third.reason.as_deref(), Some("Duplicate learning attempt"));

    assert_eq!(service.learned_intents().len(), 1);
    Ok(())
}

#[tokio::test]
async fn invalid_examples_are_rejected_without_training() -> Result<()> {
    let service = builder().clock(clock()).build()?;
    service.train_model().await?;
    let runs = service.performance_stats().training_runs;

    let cases = [
        ("hi", "Hello."),
        ("do you know rust", "<script>alert(1)</script>"),
        ("do you know rust", "javascript:alert(1)"),
        ("damn this website", "Thanks."),
    ];
    for (input, response) in cases {
        let outcome = service.add_learning_example(input, response).await;
        assert!(!outcome.success, "{input:?} / {response:?}");
        assert!(outcome.reason.is_some());
    }

    assert_eq!(service.performance_stats().training_runs, runs);
    assert!(service.learned_intents().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_save_rolls_the_example_back() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new_default());
    let service = builder()
        .clock(clock())
        .storage(storage.clone())
        .build()?;
    service.train_model().await?;

    storage.set_read_only(true);
    let outcome = service
        .add_learning_example("do you know Rust?", RUST_ANSWER)
        .await;
    assert!(!outcome.success);
    assert!(
        outcome
            .reason
            .as_deref()
            .is_some_and(|reason| reason.starts_with("Training failed"))
    );
    assert!(service.learned_intents().is_empty());
    assert!(service.is_model_ready());

    storage.set_read_only(false);
    let retry = service
        .add_learning_example("do you know Rust?", RUST_ANSWER)
        .await;
    assert!(retry.success, "{:?}", retry.reason);
    assert!(storage.exists("learned_intents.json"));
    Ok(())
}

#[tokio::test]
async fn concurrent_training_runs_once() -> Result<()> {
    let service = builder().build()?;

    let (a, b) = tokio::join!(service.train_model(), service.train_model());
    let outcomes = [a?, b?];
    let trained = outcomes
        .iter()
        .filter(|o| matches!(o, TrainingOutcome::Trained(_)))
        .count();
    let skipped = outcomes
        .iter()
        .filter(|o| **o == TrainingOutcome::AlreadyRunning)
        .count();
    assert_eq!((trained, skipped), (1, 1));
    assert_eq!(service.performance_stats().training_runs, 1);
    assert!(!service.is_training());
    Ok(())
}

#[tokio::test]
async fn learning_during_training_is_serialized() -> Result<()> {
    let service = builder().clock(clock()).build()?;
    service.train_model().await?;

    let (trained, learned) = tokio::join!(
        service.train_model(),
        service.add_learning_example("do you know Rust?", RUST_ANSWER)
    );

    match trained? {
        TrainingOutcome::Trained(_) => {
            assert!(!learned.success);
            assert_eq!(
                learned.reason.as_deref(),
                Some("Training already in progress")
            );
            assert!(service.learned_intents().is_empty());
        }
        TrainingOutcome::AlreadyRunning => {
            assert!(learned.success, "{:?}", learned.reason);
            assert_eq!(service.learned_intents().len(), 1);
        }
    }
    assert!(!service.is_training());

    service.clear_cache();
    let outcome = service.classify_detailed("hello").await?;
    assert!(matches!(outcome, ClassificationOutcome::Matched(_)));
    Ok(())
}

#[tokio::test]
async fn duplicate_is_caught_after_a_restart() -> Result<()> {
    let clock = clock();
    let storage = Arc::new(MemoryStorage::new_default());
    let first = builder()
        .clock(clock.clone())
        .storage(storage.clone())
        .build()?;
    first.train_model().await?;
    let learned = first
        .add_learning_example("do you know Rust?", RUST_ANSWER)
        .await;
    assert!(learned.success, "{:?}", learned.reason);

    clock.advance(Duration::seconds(5));
    let second = builder()
        .clock(clock.clone())
        .storage(storage.clone())
        .build()?;
    assert!(second.load_model()?);

    let repeat = second
        .add_learning_example("do you know Rust?", RUST_ANSWER)
        .await;
    assert!(!repeat.success);
    assert_eq!(repeat.reason.as_deref(), Some("Duplicate learning attempt"));
    assert_eq!(second.learned_intents().len(), 1);

    let result = second
        .classify_input("do you know Rust?")
        .await?
        .expect("learned answer");
    assert_eq!(Some(result.tag), learned.tag);
    Ok(())
}

#[tokio::test]
async fn saved_model_decides_the_learned_collection() -> Result<()> {
    let clock = clock();
    let storage = Arc::new(MemoryStorage::new_default());
    let first = builder()
        .clock(clock.clone())
        .storage(storage.clone())
        .build()?;
    first.train_model().await?;
    assert!(
        first
            .add_learning_example("do you know Rust?", RUST_ANSWER)
            .await
            .success
    );

    // An example that reached the collection but never a saved model.
    let json = String::from_utf8(storage.read("learned_intents.json")?).expect("utf-8");
    let mut on_disk = IntentDataset::from_json_str(&json)?;
    on_disk.intents.push(IntentRecord::new(
        "learned_1",
        vec!["do you know haskell"],
        vec!["A little."],
    ));
    storage.write("learned_intents.json", on_disk.to_json()?.as_bytes())?;

    let second = builder()
        .clock(clock.clone())
        .storage(storage.clone())
        .build()?;
    assert!(second.load_model()?);
    let learned = second.learned_intents();
    assert_eq!(learned.len(), 1);
    assert_eq!(learned[0].patterns, vec!["do you know Rust?"]);

    let json = String::from_utf8(storage.read("learned_intents.json")?).expect("utf-8");
    assert_eq!(IntentDataset::from_json_str(&json)?.len(), 1);
    Ok(())
}
