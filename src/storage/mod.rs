mod memory;
mod repository;

use anyhow::Result;

use crate::domain::LedgerSnapshot;

pub use memory::*;
pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Where the ledger state is kept between sessions.
///
/// Stores deal in whole snapshots: `save` replaces whatever was stored
/// before, and `load` returns `None` when nothing has ever been saved.
#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>>;

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()>;
}
