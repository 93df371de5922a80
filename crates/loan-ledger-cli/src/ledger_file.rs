//! The ledger snapshot file backing the mutating subcommands.
//!
//! Each invocation loads the whole snapshot into an [`InMemoryStore`], runs
//! one core operation against it and writes the result back. The write goes
//! to a sibling temp file first and is renamed over the original.
//!
//! Mutations go through [`LedgerFile::update`], which holds an exclusive
//! advisory lock on `<ledger>.lock` from load to save so that concurrent
//! `loanctl` runs are serialized.

use std::error::Error;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use loan_ledger_core::store::{InMemoryStore, LedgerSnapshot};
use tracing::{debug, info};

pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty ledger.
    pub fn load(&self) -> Result<InMemoryStore, Box<dyn Error>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "ledger file absent, starting empty");
            return Ok(InMemoryStore::new());
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read '{}': {}", self.path.display(), e))?;
        let snapshot: LedgerSnapshot = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", self.path.display(), e))?;
        debug!(
            path = %self.path.display(),
            loans = snapshot.loans.len(),
            payments = snapshot.payments.len(),
            "ledger loaded"
        );
        Ok(InMemoryStore::from_snapshot(snapshot))
    }

    /// Run one mutation with the ledger locked: load, apply `op`, save. A
    /// failed `op` leaves the file untouched.
    pub fn update<T>(
        &self,
        op: impl FnOnce(&InMemoryStore) -> Result<T, Box<dyn Error>>,
    ) -> Result<T, Box<dyn Error>> {
        let _lock = self.lock()?;
        let store = self.load()?;
        let value = op(&store)?;
        self.save(&store)?;
        Ok(value)
    }

    /// Blocks until the exclusive lock is held; released when the handle drops.
    fn lock(&self) -> Result<File, Box<dyn Error>> {
        let mut lock_path = self.path.clone().into_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| format!("Failed to open '{}': {}", lock_path.display(), e))?;
        file.lock_exclusive()
            .map_err(|e| format!("Failed to lock '{}': {}", lock_path.display(), e))?;
        debug!(path = %lock_path.display(), "ledger locked");
        Ok(file)
    }

    pub fn save(&self, store: &InMemoryStore) -> Result<(), Box<dyn Error>> {
        let snapshot = store.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)
            .map_err(|e| format!("Failed to write '{}': {}", tmp.display(), e))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| format!("Failed to replace '{}': {}", self.path.display(), e))?;
        info!(path = %self.path.display(), "ledger saved");
        Ok(())
    }
}
