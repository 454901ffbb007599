//! Closure ledger: one record per day of planned vs completed priorities

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::error::LedgerError;
use crate::domain::ClosureRecord;

/// Storage for daily closure records
pub trait ClosureLedger: Send + Sync {
    /// Record for `date`, or None when there is none
    fn load(&self, date: NaiveDate) -> Result<Option<ClosureRecord>, LedgerError>;

    /// Store a record, replacing any existing one for the same date
    fn save(&self, record: &ClosureRecord) -> Result<(), LedgerError>;
}

/// Ledger keeping `closure-YYYY-MM-DD.json` files in a directory
#[derive(Debug, Clone)]
pub struct FileClosureLedger {
    dir: PathBuf,
}

impl FileClosureLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("closure-{}.json", date.format("%Y-%m-%d")))
    }
}

impl ClosureLedger for FileClosureLedger {
    fn load(&self, date: NaiveDate) -> Result<Option<ClosureRecord>, LedgerError> {
        let path = self.record_path(date);
        debug!(?path, "FileClosureLedger::load: called");

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(?path, error = %e, "FileClosureLedger::load: ignoring corrupt closure record");
                Ok(None)
            }
        }
    }

    fn save(&self, record: &ClosureRecord) -> Result<(), LedgerError> {
        let path = self.record_path(record.date);
        debug!(?path, rate = record.closure_rate, "FileClosureLedger::save: called");

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;

        // Write beside the target then rename, so readers never see a partial file
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path)?;
        Ok(())
    }
}

/// In-process ledger
#[derive(Debug, Default)]
pub struct MemoryClosureLedger {
    records: Mutex<HashMap<NaiveDate, ClosureRecord>>,
}

impl MemoryClosureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ClosureLedger for MemoryClosureLedger {
    fn load(&self, date: NaiveDate) -> Result<Option<ClosureRecord>, LedgerError> {
        Ok(self.records.lock().unwrap_or_else(|e| e.into_inner()).get(&date).cloned())
    }

    fn save(&self, record: &ClosureRecord) -> Result<(), LedgerError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.date, record.clone());
        Ok(())
    }
}
