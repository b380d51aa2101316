//! Storage module for persisting crawl results
//!
//! This module handles all result persistence for the crawler, including:
//! - One JSON file per region (full overwrite on every save)
//! - The append-only master result set, deduplicated by identity key
//! - Lock-file and atomic rename discipline around master updates
//! - Offline merging of existing region files into the master set

mod json;
mod lock;
mod traits;

pub use json::JsonResultStore;
pub use lock::MasterLock;
pub use traits::{ResultStore, StorageError, StorageResult};

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A business listing with its contact details
///
/// `identity_key` (serialized as `title`) is the dedup key across runs. Absent
/// fields serialize as `null`, so "missing" never collapses into `""`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    #[serde(rename = "title", deserialize_with = "deserialize_identity")]
    pub identity_key: String,

    pub name: Option<String>,

    pub formatted_address: Option<String>,

    #[serde(rename = "international_phone_number")]
    pub phone: Option<String>,

    pub url: Option<String>,

    pub website: Option<String>,

    pub rating: Option<f64>,

    #[serde(rename = "user_ratings_total")]
    pub rating_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,

    /// Provider-specific or enrichment fields, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BusinessRecord {
    /// Creates a record with only its identity set
    ///
    /// Returns `None` for a blank key: such a record could never be deduplicated.
    pub fn new(identity_key: impl Into<String>) -> Option<Self> {
        let identity_key = identity_key.into().trim().to_string();
        if identity_key.is_empty() {
            return None;
        }

        Some(Self {
            identity_key,
            name: None,
            formatted_address: None,
            phone: None,
            url: None,
            website: None,
            rating: None,
            rating_count: None,
            place_id: None,
            extra: Map::new(),
        })
    }
}

/// Outcome of merging records into the master set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Records appended
    pub added: usize,

    /// Records whose identity key was already present
    pub skipped: usize,

    /// Size of the master set after the merge
    pub total: usize,
}

/// Builds the region file name: `<region>_<category>.json`
///
/// Whitespace runs become a single `_` and path separators are percent-escaped,
/// so the same region always maps to the same file and distinct regions never
/// share one.
pub fn region_file_name(region_name: &str, category: &str) -> String {
    format!(
        "{}_{}.json",
        normalize_component(region_name),
        normalize_component(category)
    )
}

/// Collapses whitespace runs to `_` and percent-escapes `%`, `/` and `\\`
///
/// Escaping keeps names that differ only in a separator ("a/b" vs "a b") on
/// distinct files.
fn normalize_component(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .replace('%', "%25")
        .replace('/', "%2F")
        .replace('\\', "%5C")
}

/// Merges every region file the store knows about into the master set
///
/// Unreadable region files are logged and skipped.
pub fn merge_region_files(store: &dyn ResultStore) -> StorageResult<MergeOutcome> {
    let mut records = Vec::new();

    for path in store.region_files()? {
        match store.read_region_file(&path) {
            Ok(mut file_records) => {
                tracing::info!("Read {} records from {}", file_records.len(), path.display());
                records.append(&mut file_records);
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable region file {}: {}", path.display(), e);
            }
        }
    }

    store.merge_into_master(&records)
}

/// Runs [`ResultStore::merge_into_master`] on the blocking thread pool
///
/// Waiting on the master lock then never stalls an async worker.
pub async fn merge_in_background<S>(
    store: &S,
    records: Vec<BusinessRecord>,
) -> StorageResult<MergeOutcome>
where
    S: ResultStore + Clone + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || store.merge_into_master(&records)).await?
}

/// Trims the identity key on the way in; a blank key is rejected
fn deserialize_identity<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let key = String::deserialize(deserializer)?;
    let key = key.trim();
    if key.is_empty() {
        return Err(de::Error::custom("title cannot be blank"));
    }
    Ok(key.to_string())
}
