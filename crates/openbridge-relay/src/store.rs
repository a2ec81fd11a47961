//! Transfer record store.
//!
//! Records are versioned. Every write after the initial insert is a
//! compare-and-swap on the version the writer last read, so two writers can
//! never silently overwrite each other's transitions.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use openbridge_types::{BridgeError, RequestId, Result, TransferRecord};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A record together with the version it was read at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned {
    pub version: u64,
    pub record: TransferRecord,
}

/// Result of [`RecordStore::insert`].
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(Versioned),
    /// A record with the same request id already exists; it is returned
    /// unchanged.
    Existing(Versioned),
}

/// Atomic key-value store of transfer records.
pub trait RecordStore: Send + Sync {
    fn get(&self, request_id: &RequestId) -> Result<Option<Versioned>>;

    /// Insert a new record at version 1 unless its id is already taken.
    fn insert(&self, record: TransferRecord) -> Result<InsertOutcome>;

    /// Replace the record if its stored version is still `expected_version`.
    ///
    /// # Errors
    /// [`BridgeError::ConcurrentModification`] if another writer got there
    /// first, [`BridgeError::TransferNotFound`] if the id is unknown.
    fn compare_and_swap(
        &self,
        request_id: &RequestId,
        expected_version: u64,
        record: TransferRecord,
    ) -> Result<Versioned>;

    /// All records, oldest first.
    fn list(&self) -> Result<Vec<Versioned>>;
}

fn conflict(request_id: &RequestId, expected: u64, actual: u64) -> BridgeError {
    BridgeError::ConcurrentModification {
        request_id: request_id.to_string(),
        expected,
        actual,
    }
}

fn not_found(request_id: &RequestId) -> BridgeError {
    BridgeError::TransferNotFound {
        request_id: request_id.to_string(),
    }
}

fn sort_oldest_first(records: &mut [Versioned]) {
    records.sort_by(|a, b| {
        a.record
            .created_at
            .cmp(&b.record.created_at)
            .then_with(|| a.record.id().cmp(b.record.id()))
    });
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<RequestId, Versioned>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, request_id: &RequestId) -> Result<Option<Versioned>> {
        Ok(self.records.lock().get(request_id).cloned())
    }

    fn insert(&self, record: TransferRecord) -> Result<InsertOutcome> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(record.id()) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        let versioned = Versioned { version: 1, record };
        records.insert(versioned.record.id().clone(), versioned.clone());
        Ok(InsertOutcome::Inserted(versioned))
    }

    fn compare_and_swap(
        &self,
        request_id: &RequestId,
        expected_version: u64,
        record: TransferRecord,
    ) -> Result<Versioned> {
        let mut records = self.records.lock();
        let current = records.get_mut(request_id).ok_or_else(|| not_found(request_id))?;
        if current.version != expected_version {
            return Err(conflict(request_id, expected_version, current.version));
        }
        *current = Versioned {
            version: expected_version + 1,
            record,
        };
        Ok(current.clone())
    }

    fn list(&self) -> Result<Vec<Versioned>> {
        let mut all: Vec<Versioned> = self.records.lock().values().cloned().collect();
        sort_oldest_first(&mut all);
        Ok(all)
    }
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// One JSON document per record under a directory.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash never leaves a half-written record. The in-process mutex makes
/// compare-and-swap atomic for all handles sharing this store.
pub struct JsonFileRecordStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRecordStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, request_id: &RequestId) -> PathBuf {
        self.dir.join(format!("{request_id}.json"))
    }

    fn read(&self, request_id: &RequestId) -> Result<Option<Versioned>> {
        let path = self.path_for(request_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn write(&self, versioned: &Versioned) -> Result<()> {
        let path = self.path_for(versioned.record.id());
        let tmp = self.dir.join(format!(".{}.json.tmp", versioned.record.id()));
        fs::write(&tmp, serde_json::to_vec_pretty(versioned)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl RecordStore for JsonFileRecordStore {
    fn get(&self, request_id: &RequestId) -> Result<Option<Versioned>> {
        self.read(request_id)
    }

    fn insert(&self, record: TransferRecord) -> Result<InsertOutcome> {
        let _guard = self.write_lock.lock();
        if let Some(existing) = self.read(record.id())? {
            return Ok(InsertOutcome::Existing(existing));
        }
        let versioned = Versioned { version: 1, record };
        self.write(&versioned)?;
        Ok(InsertOutcome::Inserted(versioned))
    }

    fn compare_and_swap(
        &self,
        request_id: &RequestId,
        expected_version: u64,
        record: TransferRecord,
    ) -> Result<Versioned> {
        let _guard = self.write_lock.lock();
        let current = self.read(request_id)?.ok_or_else(|| not_found(request_id))?;
        if current.version != expected_version {
            return Err(conflict(request_id, expected_version, current.version));
        }
        let next = Versioned {
            version: expected_version + 1,
            record,
        };
        self.write(&next)?;
        Ok(next)
    }

    fn list(&self) -> Result<Vec<Versioned>> {
        let mut all = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if !is_record {
                continue;
            }
            let json = fs::read_to_string(&path)?;
            all.push(serde_json::from_str(&json)?);
        }
        sort_oldest_first(&mut all);
        Ok(all)
    }
}
