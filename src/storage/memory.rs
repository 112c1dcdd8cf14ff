use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::{Result, anyhow, bail};

use crate::domain::LedgerSnapshot;

use super::SnapshotStore;

/// Snapshot store that lives in memory. Used by tests and dry runs.
///
/// Saves can be made to fail on demand to exercise the service's
/// best-effort persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<LedgerSnapshot>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last snapshot saved, if any.
    pub fn stored(&self) -> Option<LedgerSnapshot> {
        self.snapshot.lock().ok().and_then(|guard| guard.clone())
    }
}

impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>> {
        let guard = self
            .snapshot
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(guard.clone())
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("Memory store is refusing saves");
        }
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        *guard = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
