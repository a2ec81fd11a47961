//! Append-only risk audit log.
//!
//! Every assessment the risk gate produces, accepted or not, lands here
//! exactly once, keyed by request id. An optional JSON-lines journal makes
//! the log survive restarts; on open, existing journal lines are replayed
//! into memory.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use openbridge_types::{BridgeError, RequestId, Result, RiskAssessment};
use parking_lot::Mutex;

struct AuditState {
    entries: Vec<RiskAssessment>,
    index: HashMap<RequestId, usize>,
    journal: Option<File>,
}

/// Append-only store of risk assessments.
pub struct AuditLog {
    state: Mutex<AuditState>,
    path: Option<PathBuf>,
}

impl AuditLog {
    /// A log kept only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(AuditState {
                entries: Vec::new(),
                index: HashMap::new(),
                journal: None,
            }),
            path: None,
        }
    }

    /// A log backed by a JSON-lines journal at `path`.
    ///
    /// # Errors
    /// Returns [`BridgeError::Storage`] if the journal cannot be opened and
    /// [`BridgeError::Serialization`] if an existing line does not parse.
    pub fn with_journal(path: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let assessment: RiskAssessment = serde_json::from_str(&line)?;
                index.insert(assessment.request_id.clone(), entries.len());
                entries.push(assessment);
            }
        }
        let journal = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            state: Mutex::new(AuditState {
                entries,
                index,
                journal: Some(journal),
            }),
            path: Some(path.to_path_buf()),
        })
    }

    /// Record an assessment.
    ///
    /// # Errors
    /// Returns [`BridgeError::DuplicateAssessment`] if the request id already
    /// has one, or a storage error if the journal write fails. Nothing is
    /// recorded in either case.
    pub fn append(&self, assessment: RiskAssessment) -> Result<()> {
        let mut state = self.state.lock();
        if state.index.contains_key(&assessment.request_id) {
            return Err(BridgeError::DuplicateAssessment {
                request_id: assessment.request_id.to_string(),
            });
        }
        if let Some(journal) = state.journal.as_mut() {
            let mut line = serde_json::to_string(&assessment)?;
            line.push('\n');
            journal.write_all(line.as_bytes())?;
            journal.flush()?;
        }
        let position = state.entries.len();
        state.index.insert(assessment.request_id.clone(), position);
        state.entries.push(assessment);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, request_id: &RequestId) -> Option<RiskAssessment> {
        let state = self.state.lock();
        state
            .index
            .get(request_id)
            .map(|&i| state.entries[i].clone())
    }

    #[must_use]
    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.state.lock().index.contains_key(request_id)
    }

    /// All assessments in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> Vec<RiskAssessment> {
        self.state.lock().entries.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Journal location, if the log is persistent.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::in_memory()
    }
}
