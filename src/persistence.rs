//! Atomic persistence of the trained model.
//!
//! A saved model is three blobs: the network weights (bincode), the
//! metadata (JSON: vocabulary, intents, save time, training metrics) and a
//! manifest naming the generation both blobs belong to, with their CRC32
//! checksums. Blobs are written under generation-specific keys first; the
//! manifest is then replaced atomically. A reader therefore sees either the
//! previous model or the new one, never a mix.
//!
//! Anything inconsistent on load (missing blob, checksum or version
//! mismatch, shapes that disagree) means "no saved model". Storage I/O
//! errors are still returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::Vocabulary;
use crate::error::{ModelError, Result};
use crate::intent::{IntentDataset, IntentRecord};
use crate::ml::{IntentNetwork, TrainingMetrics};
use crate::storage::Storage;

const MANIFEST_KEY: &str = "model.manifest.json";
const MANIFEST_VERSION: u32 = 1;
const WEIGHTS_PREFIX: &str = "model.weights.";
const METADATA_PREFIX: &str = "model.metadata.";

/// Key of the learned-examples collection.
pub const LEARNED_KEY: &str = "learned_intents.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelManifest {
    version: u32,
    generation: u64,
    weights_crc32: u32,
    metadata_crc32: u32,
    saved_at: DateTime<Utc>,
}

/// Everything needed to classify, besides the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub vocabulary: Vocabulary,
    pub intents: Vec<IntentRecord>,
    pub saved_at: DateTime<Utc>,
    pub metrics: TrainingMetrics,
}

/// A model as it is written to and read from storage.
#[derive(Debug, Clone)]
pub struct PersistedModel {
    pub network: IntentNetwork,
    pub metadata: ModelMetadata,
}

impl PersistedModel {
    /// Check that the weights are finite, every intent can answer, and the
    /// network is as wide as the vocabulary and as tall as the intent list.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.metadata
            .intents
            .iter()
            .try_for_each(IntentRecord::validate)?;
        if self.network.input_dim() != self.metadata.vocabulary.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.metadata.vocabulary.len(),
                actual: self.network.input_dim(),
            }
            .into());
        }
        if self.network.output_dim() != self.metadata.intents.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.metadata.intents.len(),
                actual: self.network.output_dim(),
            }
            .into());
        }
        Ok(())
    }
}

fn weights_key(generation: u64) -> String {
    format!("{WEIGHTS_PREFIX}{generation}.bin")
}

fn metadata_key(generation: u64) -> String {
    format!("{METADATA_PREFIX}{generation}.json")
}

/// Generation number encoded in a blob key.
fn generation_of(key: &str) -> Option<u64> {
    let rest = key
        .strip_prefix(WEIGHTS_PREFIX)
        .and_then(|r| r.strip_suffix(".bin"))
        .or_else(|| {
            key.strip_prefix(METADATA_PREFIX)
                .and_then(|r| r.strip_suffix(".json"))
        })?;
    rest.parse().ok()
}

/// Saves and loads models through a [`Storage`] backend.
#[derive(Debug, Clone)]
pub struct ModelStore {
    storage: Arc<dyn Storage>,
}

impl ModelStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Whether a manifest exists. Says nothing about its validity.
    pub fn has_model(&self) -> bool {
        self.storage.exists(MANIFEST_KEY)
    }

    /// Save a model and return its generation.
    ///
    /// Any failure is reported as [`ModelError::SaveFailed`]; the previously
    /// saved model stays loadable.
    pub fn save(&self, model: &PersistedModel) -> Result<u64> {
        self.save_inner(model).map_err(|e| {
            ModelError::SaveFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }

    fn save_inner(&self, model: &PersistedModel) -> Result<u64> {
        let keys = self.storage.list()?;
        let generation = keys.iter().filter_map(|k| generation_of(k)).max().unwrap_or(0) + 1;

        let weights = bincode::serialize(&model.network)?;
        let metadata = serde_json::to_vec(&model.metadata)?;

        self.storage.write(&weights_key(generation), &weights)?;
        self.storage.write(&metadata_key(generation), &metadata)?;

        let manifest = ModelManifest {
            version: MANIFEST_VERSION,
            generation,
            weights_crc32: crc32fast::hash(&weights),
            metadata_crc32: crc32fast::hash(&metadata),
            saved_at: model.metadata.saved_at,
        };
        self.storage
            .write_atomic(MANIFEST_KEY, &serde_json::to_vec_pretty(&manifest)?)?;

        info!(
            "Saved model generation {} ({} bytes of weights)",
            generation,
            weights.len()
        );

        for key in keys {
            if generation_of(&key).is_some_and(|g| g != generation) {
                if let Err(e) = self.storage.delete(&key) {
                    warn!("Failed to delete stale model blob {key}: {e}");
                }
            }
        }

        Ok(generation)
    }

    /// Load the current model, or `None` when nothing valid is saved.
    pub fn load(&self) -> Result<Option<PersistedModel>> {
        let Some(manifest_bytes) = self.storage.read_optional(MANIFEST_KEY)? else {
            debug!("No saved model");
            return Ok(None);
        };

        let manifest: ModelManifest = match serde_json::from_slice(&manifest_bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Ignoring saved model: unreadable manifest: {e}");
                return Ok(None);
            }
        };
        if manifest.version != MANIFEST_VERSION {
            warn!(
                "Ignoring saved model: manifest version mismatch: expected {}, found {}",
                MANIFEST_VERSION, manifest.version
            );
            return Ok(None);
        }

        let Some(weights) = self.storage.read_optional(&weights_key(manifest.generation))? else {
            warn!("Ignoring saved model: weights of generation {} missing", manifest.generation);
            return Ok(None);
        };
        let Some(metadata) = self.storage.read_optional(&metadata_key(manifest.generation))?
        else {
            warn!("Ignoring saved model: metadata of generation {} missing", manifest.generation);
            return Ok(None);
        };

        if crc32fast::hash(&weights) != manifest.weights_crc32
            || crc32fast::hash(&metadata) != manifest.metadata_crc32
        {
            warn!("Ignoring saved model: checksum mismatch in generation {}", manifest.generation);
            return Ok(None);
        }

        let network: IntentNetwork = match bincode::deserialize(&weights) {
            Ok(network) => network,
            Err(e) => {
                warn!("Ignoring saved model: undecodable weights: {e}");
                return Ok(None);
            }
        };
        let metadata: ModelMetadata = match serde_json::from_slice(&metadata) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Ignoring saved model: undecodable metadata: {e}");
                return Ok(None);
            }
        };

        let persisted = PersistedModel { network, metadata };
        if let Err(e) = persisted.validate() {
            warn!("Ignoring saved model: {e}");
            return Ok(None);
        }

        info!(
            "Loaded model generation {} saved at {}",
            manifest.generation, manifest.saved_at
        );
        Ok(Some(persisted))
    }

    /// Remove the saved model.
    pub fn clear(&self) -> Result<()> {
        self.storage.delete(MANIFEST_KEY)?;
        for key in self.storage.list()? {
            if generation_of(&key).is_some() {
                self.storage.delete(&key)?;
            }
        }
        Ok(())
    }

    /// Persist the learned-examples collection.
    pub fn save_learned(&self, learned: &IntentDataset) -> Result<()> {
        self.storage
            .write_atomic(LEARNED_KEY, learned.to_json()?.as_bytes())
    }

    /// Load the learned-examples collection. An unreadable collection is
    /// logged and treated as empty.
    pub fn load_learned(&self) -> Result<IntentDataset> {
        let Some(bytes) = self.storage.read_optional(LEARNED_KEY)? else {
            return Ok(IntentDataset::default());
        };
        match std::str::from_utf8(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|json| IntentDataset::from_json_str(json).map_err(|e| e.to_string()))
        {
            Ok(dataset) => Ok(dataset),
            Err(e) => {
                warn!("Ignoring learned examples: {e}");
                Ok(IntentDataset::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::config::HiddenLayerConfig;
    use crate::storage::MemoryStorage;

    fn model() -> PersistedModel {
        let intents = vec![
            IntentRecord::new("greeting", vec!["hello there"], vec!["Hi!"]),
            IntentRecord::new("pricing", vec!["how much"], vec!["It depends."]),
        ];
        let vocabulary = Vocabulary::build(&intents);
        let mut rng = StdRng::seed_from_u64(9);
        let network = IntentNetwork::new(
            vocabulary.len(),
            &[HiddenLayerConfig::new(4, 0.0, 0.0)],
            intents.len(),
            &mut rng,
        )
        .unwrap();
        PersistedModel {
            network,
            metadata: ModelMetadata {
                vocabulary,
                intents,
                saved_at: Utc::now(),
                metrics: TrainingMetrics::default(),
            },
        }
    }

    fn store() -> (ModelStore, MemoryStorage) {
        let storage = MemoryStorage::new_default();
        (ModelStore::new(Arc::new(storage.clone())), storage)
    }

    #[test]
    fn test_save_then_load() {
        let (store, _) = store();
        assert!(store.load().unwrap().is_none());

        let saved = model();
        assert_eq!(store.save(&saved).unwrap(), 1);
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.network, saved.network);
        assert_eq!(loaded.metadata, saved.metadata);
    }

    #[test]
    fn test_new_generation_removes_old_blobs() {
        let (store, storage) = store();
        store.save(&model()).unwrap();
        assert_eq!(store.save(&model()).unwrap(), 2);

        let keys = storage.list().unwrap();
        assert!(keys.contains(&weights_key(2)));
        assert!(!keys.contains(&weights_key(1)));
        assert!(!keys.contains(&metadata_key(1)));
    }

    #[test]
    fn test_corrupt_weights_mean_no_model() {
        let (store, storage) = store();
        store.save(&model()).unwrap();
        storage.write(&weights_key(1), b"garbage").unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_missing_blob_means_no_model() {
        let (store, storage) = store();
        store.save(&model()).unwrap();
        storage.delete(&metadata_key(1)).unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_unreadable_manifest_means_no_model() {
        let (store, storage) = store();
        store.save(&model()).unwrap();
        storage.write(MANIFEST_KEY, b"{not json").unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_interrupted_save_keeps_previous_model() {
        let (store, storage) = store();
        let first = model();
        store.save(&first).unwrap();

        // Blobs of a later generation without a manifest update.
        storage.write(&weights_key(2), b"partial").unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.network, first.network);
    }

    #[test]
    fn test_shape_mismatch_means_no_model() {
        let (store, _) = store();
        let mut bad = model();
        bad.metadata.intents.pop();
        store.save(&bad).unwrap();

        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_validate_reports_shape_mismatch() {
        assert!(model().validate().is_ok());

        let mut bad = model();
        bad.metadata.intents.pop();
        let err = bad.validate().unwrap_err();
        assert!(matches!(
            err,
            crate::error::ParleyError::Model(ModelError::ShapeMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_save_failure_is_reported() {
        let (store, storage) = store();
        storage.set_read_only(true);

        let err = store.save(&model()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ParleyError::Model(ModelError::SaveFailed { .. })
        ));
    }

    #[test]
    fn test_clear() {
        let (store, storage) = store();
        store.save(&model()).unwrap();
        store.clear().unwrap();

        assert!(!store.has_model());
        assert_eq!(storage.file_count(), 0);
    }

    #[test]
    fn test_learned_collection() {
        let (store, storage) = store();
        assert!(store.load_learned().unwrap().is_empty());

        let learned = IntentDataset::new(vec![IntentRecord::new(
            "learned_1",
            vec!["do you know rust"],
            vec!["Yes."],
        )]);
        store.save_learned(&learned).unwrap();
        assert_eq!(store.load_learned().unwrap(), learned);

        storage.write(LEARNED_KEY, b"[broken").unwrap();
        assert!(store.load_learned().unwrap().is_empty());
    }

    #[test]
    fn test_generation_of() {
        assert_eq!(generation_of("model.weights.12.bin"), Some(12));
        assert_eq!(generation_of("model.metadata.3.json"), Some(3));
        assert_eq!(generation_of("model.manifest.json"), None);
        assert_eq!(generation_of(LEARNED_KEY), None);
    }
}
