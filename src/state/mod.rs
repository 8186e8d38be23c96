pub mod types;

pub use types::{BuildStatus, PrKey, PrRecord, ReconciliationTable};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize reconciliation table: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable copy of the reconciliation table. Whole-table semantics only:
/// `save_all` replaces whatever was stored before.
pub trait StateStore: Send + Sync {
    fn load_all(&self) -> Result<ReconciliationTable, StoreError>;

    fn save_all(&self, table: &ReconciliationTable) -> Result<(), StoreError>;
}

/// Stores the table as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the data file; a bare file name lives in ".".
    fn data_dir(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStore {
    /// A missing file is an empty table. So is a file that does not parse:
    /// the next save overwrites it.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load_all(&self) -> Result<ReconciliationTable, StoreError> {
        if !self.path.exists() {
            debug!("no data file yet, starting empty");
            return Ok(ReconciliationTable::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&contents) {
            Ok(table) => Ok(table),
            Err(e) => {
                warn!(error = %e, "data file is not a valid table, starting empty");
                Ok(ReconciliationTable::new())
            }
        }
    }

    fn save_all(&self, table: &ReconciliationTable) -> Result<(), StoreError> {
        let json = serde_json::to_string(table)?;
        let temp = self.temp_path();
        let mut file = File::create(&temp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)?;
        // the rename is only durable once the directory entry is on disk
        File::open(self.data_dir())?.sync_all()?;
        debug!(path = %self.path.display(), records = table.len(), "saved reconciliation table");
        Ok(())
    }
}
