// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use divvy::application::LedgerService;
use divvy::domain::{Cents, NewExpense, ParticipantId};
use divvy::storage::SnapshotStore;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&db_path(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Path of the test database inside `temp_dir`
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir.path().join("test.db").to_str().unwrap().to_string()
}

/// Add participants by name, returning their ids in the same order
pub async fn add_people<S: SnapshotStore>(
    service: &mut LedgerService<S>,
    names: &[&str],
) -> Result<Vec<ParticipantId>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        ids.push(service.add_participant(name, None).await?.id);
    }
    Ok(ids)
}

/// Record an expense paid by `paid_by` and split among `split`
pub async fn pay<S: SnapshotStore>(
    service: &mut LedgerService<S>,
    description: &str,
    amount_cents: Cents,
    paid_by: ParticipantId,
    split: &[ParticipantId],
) -> Result<()> {
    service
        .add_expense(NewExpense::new(
            description,
            amount_cents,
            paid_by,
            split.to_vec(),
        ))
        .await?;
    Ok(())
}

/// Balance of one participant, in cents
pub fn balance_of<S: SnapshotStore>(service: &LedgerService<S>, id: ParticipantId) -> Cents {
    service
        .balances()
        .into_iter()
        .find(|b| b.id() == id)
        .map(|b| b.balance)
        .unwrap()
}
