use std::fs;
use std::io::ErrorKind;

use log::debug;
use quiz_core::model::AttemptLedger;

use super::JsonRepository;
use super::atomic::write_atomic;
use crate::repository::{LedgerRepository, StorageError};

impl LedgerRepository for JsonRepository {
    fn load_ledger(&self) -> Result<Option<AttemptLedger>, StorageError> {
        let path = &self.ledger_path;
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(path, e)),
        };
        let ledger: AttemptLedger =
            serde_json::from_slice(&raw).map_err(|e| StorageError::parse(path, e))?;
        debug!("loaded {} attempt records from {}", ledger.len(), path.display());
        Ok(Some(ledger))
    }

    fn save_ledger(&self, ledger: &AttemptLedger) -> Result<(), StorageError> {
        let path = &self.ledger_path;
        let bytes = serde_json::to_vec(ledger).map_err(|e| StorageError::parse(path, e))?;
        write_atomic(path, &bytes)?;
        debug!("saved {} attempt records to {}", ledger.len(), path.display());
        Ok(())
    }
}
