use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::LedgerSnapshot;
use crate::storage::SnapshotStore;

/// Current version of the full export format
pub const EXPORT_VERSION: &str = "1";

/// Ledger snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: LedgerSnapshot,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a, S: SnapshotStore> {
    service: &'a LedgerService<S>,
}

impl<'a, S: SnapshotStore> Exporter<'a, S> {
    pub fn new(service: &'a LedgerService<S>) -> Self {
        Self { service }
    }

    /// Export the expense history to CSV, settlement records included.
    pub fn export_expenses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "description",
            "category",
            "amount_cents",
            "paid_by",
            "split_among",
            "is_settlement",
            "is_settled",
            "settlement_id",
        ])?;

        let mut count = 0;
        for expense in self.service.list_expenses() {
            let paid_by = expense
                .paid_by
                .map(|id| self.service.participant_name(id).to_string())
                .unwrap_or_default();
            let split_among = expense
                .split_among
                .iter()
                .map(|id| self.service.participant_name(*id))
                .collect::<Vec<_>>()
                .join(";");

            csv_writer.write_record([
                expense.id.to_string(),
                expense.date.to_rfc3339(),
                expense.description.clone(),
                expense.category.clone().unwrap_or_default(),
                expense.amount_cents.to_string(),
                paid_by,
                split_among,
                expense.is_settlement.to_string(),
                expense.is_settled.to_string(),
                expense
                    .settlement_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export current balances to CSV format
    pub fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["participant", "total_paid", "total_owed", "balance"])?;

        let mut count = 0;
        for entry in self.service.balances() {
            csv_writer.write_record([
                entry.participant.name.clone(),
                entry.total_paid.to_string(),
                entry.total_owed.to_string(),
                entry.balance.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the whole ledger as JSON
    pub fn export_full_json<W: Write>(&self, writer: W) -> Result<LedgerExport> {
        let export = LedgerExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            snapshot: self.service.snapshot(),
        };

        serde_json::to_writer_pretty(writer, &export)?;
        Ok(export)
    }
}
