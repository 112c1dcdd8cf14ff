use anyhow::{Context, Result, bail};
use std::io::Read;
use tracing::info;

use crate::application::{LedgerService, validate_snapshot};
use crate::storage::SnapshotStore;

use super::export::{EXPORT_VERSION, LedgerExport};

/// Result of an import operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportResult {
    pub participants: usize,
    pub expenses: usize,
    pub applied: bool,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate without replacing the ledger
    pub dry_run: bool,
}

/// Parse a full JSON export.
pub fn read_full_json<R: Read>(reader: R) -> Result<LedgerExport> {
    let export: LedgerExport =
        serde_json::from_reader(reader).context("Failed to parse ledger export")?;
    if export.version != EXPORT_VERSION {
        bail!(
            "Unsupported export version '{}' (expected '{}')",
            export.version,
            EXPORT_VERSION
        );
    }
    Ok(export)
}

/// Replace the service's ledger with a full JSON export.
///
/// The export is validated first; with `dry_run` nothing is changed.
pub async fn import_full_json<S: SnapshotStore, R: Read>(
    service: &mut LedgerService<S>,
    reader: R,
    options: ImportOptions,
) -> Result<ImportResult> {
    let export = read_full_json(reader)?;
    let participants = export.snapshot.participants.len();
    let expenses = export.snapshot.expenses.len();

    if options.dry_run {
        validate_snapshot(&export.snapshot)?;
        info!(participants, expenses, "validated import (dry run)");
        return Ok(ImportResult {
            participants,
            expenses,
            applied: false,
        });
    }

    service.replace_snapshot(export.snapshot).await?;
    Ok(ImportResult {
        participants,
        expenses,
        applied: true,
    })
}
