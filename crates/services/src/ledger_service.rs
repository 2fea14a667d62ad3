use std::sync::Arc;

use log::{debug, warn};
use quiz_core::model::AttemptLedger;
use storage::repository::LedgerRepository;

use crate::error::LedgerError;

/// Loads and persists the attempt ledger.
///
/// Loading never fails: losing history only costs re-accumulating it.
#[derive(Clone)]
pub struct LedgerService {
    repo: Arc<dyn LedgerRepository>,
}

impl LedgerService {
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>) -> Self {
        Self { repo }
    }

    /// Persisted ledger, or an empty one when nothing usable is stored.
    #[must_use]
    pub fn load(&self) -> AttemptLedger {
        match self.repo.load_ledger() {
            Ok(Some(ledger)) => ledger,
            Ok(None) => {
                debug!("no attempt history yet, starting empty");
                AttemptLedger::new()
            }
            Err(err) => {
                warn!("attempt history unreadable, starting empty: {err}");
                AttemptLedger::new()
            }
        }
    }

    /// Overwrite the persisted ledger.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Save` on failure; the caller's in-memory ledger stays valid.
    pub fn save(&self, ledger: &AttemptLedger) -> Result<(), LedgerError> {
        self.repo.save_ledger(ledger).map_err(|err| {
            warn!("failed to save attempt history: {err}");
            LedgerError::Save(err)
        })
    }
}
