//! JSON file storage implementation
//!
//! This module provides a filesystem-backed implementation of the ResultStore trait.
//! Every write goes to a temp file in the destination directory and is renamed
//! over the target, so readers never observe a half-written file.

use crate::config::OutputConfig;
use crate::storage::lock::MasterLock;
use crate::storage::traits::{ResultStore, StorageError, StorageResult};
use crate::storage::{region_file_name, BusinessRecord, MergeOutcome};
use chrono::Utc;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// What was found at the master path
enum MasterFile {
    Missing,
    Parsed(Vec<Value>),
    Malformed(String),
}

/// JSON file result store
#[derive(Debug, Clone)]
pub struct JsonResultStore {
    region_dir: PathBuf,
    master_path: PathBuf,
    lock_timeout: Duration,
}

impl JsonResultStore {
    /// Creates a store rooted at `region_dir` with the master set at `master_path`
    pub fn new(region_dir: impl Into<PathBuf>, master_path: impl Into<PathBuf>) -> Self {
        Self {
            region_dir: region_dir.into(),
            master_path: master_path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.region_dir, &config.master_path)
            .with_lock_timeout(Duration::from_millis(config.lock_timeout_ms))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Path of the region file for `region_name` and `category`
    pub fn region_path(&self, region_name: &str, category: &str) -> PathBuf {
        self.region_dir.join(region_file_name(region_name, category))
    }

    pub fn master_path(&self) -> &Path {
        &self.master_path
    }

    fn read_master(&self) -> StorageResult<MasterFile> {
        let content = match std::fs::read_to_string(&self.master_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MasterFile::Missing),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(entries)) => Ok(MasterFile::Parsed(entries)),
            Ok(other) => Ok(MasterFile::Malformed(format!(
                "expected a JSON array, found {}",
                json_kind(&other)
            ))),
            Err(e) => Ok(MasterFile::Malformed(e.to_string())),
        }
    }

    /// Copies a corrupt master file aside before it is replaced
    fn backup_corrupt_master(&self) -> StorageResult<PathBuf> {
        let mut name = self
            .master_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
        let backup = self.master_path.with_file_name(name);

        std::fs::copy(&self.master_path, &backup)?;
        Ok(backup)
    }
}

impl ResultStore for JsonResultStore {
    fn save_region(
        &self,
        region_name: &str,
        category: &str,
        records: &[BusinessRecord],
    ) -> StorageResult<PathBuf> {
        let path = self.region_path(region_name, category);
        write_json_atomic(&path, &records)?;
        tracing::debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }

    fn load_region(
        &self,
        region_name: &str,
        category: &str,
    ) -> StorageResult<Vec<BusinessRecord>> {
        let path = self.region_path(region_name, category);
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn region_exists(&self, region_name: &str, category: &str) -> bool {
        self.region_path(region_name, category).is_file()
    }

    fn region_files(&self) -> StorageResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.region_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_region_file(&self, path: &Path) -> StorageResult<Vec<BusinessRecord>> {
        let content = std::fs::read_to_string(path)?;
        let malformed = |message: String| StorageError::MalformedRegionFile {
            path: path.to_path_buf(),
            message,
        };

        let items = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(items)) => items,
            Ok(object @ Value::Object(_)) => vec![object],
            Ok(other) => {
                return Err(malformed(format!(
                    "expected an array or object, found {}",
                    json_kind(&other)
                )))
            }
            Err(e) => return Err(malformed(e.to_string())),
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<BusinessRecord>(item) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping entry {} in {}: {}", index, path.display(), e);
                }
            }
        }
        Ok(records)
    }

    fn load_master(&self) -> StorageResult<Vec<Value>> {
        match self.read_master()? {
            MasterFile::Missing => Ok(Vec::new()),
            MasterFile::Parsed(entries) => Ok(entries),
            MasterFile::Malformed(reason) => {
                tracing::warn!(
                    "Master file {} is malformed ({}); treating it as empty",
                    self.master_path.display(),
                    reason
                );
                Ok(Vec::new())
            }
        }
    }

    fn merge_into_master(&self, records: &[BusinessRecord]) -> StorageResult<MergeOutcome> {
        let _lock = MasterLock::acquire(&self.master_path, self.lock_timeout)?;

        let (mut entries, corrupt) = match self.read_master()? {
            MasterFile::Missing => (Vec::new(), false),
            MasterFile::Parsed(entries) => (entries, false),
            MasterFile::Malformed(reason) => {
                tracing::warn!(
                    "Master file {} is malformed ({}); starting from an empty set",
                    self.master_path.display(),
                    reason
                );
                (Vec::new(), true)
            }
        };

        let mut known: HashSet<String> = entries
            .iter()
            .filter_map(identity_of)
            .map(str::to_string)
            .collect();

        let mut outcome = MergeOutcome::default();
        for record in records {
            if known.insert(record.identity_key.clone()) {
                entries.push(serde_json::to_value(record)?);
                outcome.added += 1;
            } else {
                tracing::debug!("'{}' already in master set", record.identity_key);
                outcome.skipped += 1;
            }
        }
        outcome.total = entries.len();

        if outcome.added > 0 {
            if corrupt {
                let backup = self.backup_corrupt_master()?;
                tracing::warn!("Preserved malformed master file as {}", backup.display());
            }
            write_json_atomic(&self.master_path, &entries)?;
        }

        tracing::info!(
            "Master merge: {} added, {} already present, {} total",
            outcome.added,
            outcome.skipped,
            outcome.total
        );
        Ok(outcome)
    }
}

/// Trimmed identity key of a master entry, if it has a non-blank one
fn identity_of(entry: &Value) -> Option<&str> {
    entry
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Pretty-prints `value` (4-space indent) to a temp file beside `path`, then renames it over `path`
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut serializer)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;

    temp.persist(path).map_err(|e| StorageError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
