use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Expense, LedgerSnapshot, Participant, ParticipantId, Settlement};

use super::{MIGRATION_001_INITIAL, SnapshotStore};

const SAVED_AT_KEY: &str = "saved_at";

/// SQLite-backed snapshot store.
///
/// Participants and expenses live in their own tables; list-valued expense
/// fields are stored as JSON text. A save rewrites both tables inside one
/// transaction, so a failed save leaves the previous snapshot intact.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate). Safe to run on an
    /// existing database.
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// When the ledger was last saved, if ever.
    pub async fn last_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT value FROM ledger_meta WHERE key = ?")
            .bind(SAVED_AT_KEY)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read ledger metadata")?;

        row.map(|row| {
            let value: String = row.get("value");
            parse_timestamp(&value, "saved_at")
        })
        .transpose()
    }

    async fn load_participants(&self) -> Result<Vec<Participant>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, email, created_at
            FROM participants
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list participants")?;

        rows.iter().map(Self::row_to_participant).collect()
    }

    async fn load_expenses(&self) -> Result<Vec<Expense>> {
        let rows = sqlx::query(
            r#"
            SELECT id, description, amount_cents, paid_by, split_among, category, date,
                   is_settlement, settlement_details, is_settled, settlement_id
            FROM expenses
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list expenses")?;

        rows.iter().map(Self::row_to_expense).collect()
    }

    fn row_to_participant(row: &sqlx::sqlite::SqliteRow) -> Result<Participant> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Participant {
            id: Uuid::parse_str(&id_str).context("Invalid participant ID")?,
            name: row.get("name"),
            email: row.get("email"),
            created_at: parse_timestamp(&created_at_str, "created_at")?,
        })
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let paid_by_str: Option<String> = row.get("paid_by");
        let split_json: String = row.get("split_among");
        let details_json: String = row.get("settlement_details");
        let date_str: String = row.get("date");
        let settlement_id_str: Option<String> = row.get("settlement_id");

        let split_among: Vec<ParticipantId> =
            serde_json::from_str(&split_json).context("Invalid split_among JSON")?;
        let settlement_details: Vec<Settlement> =
            serde_json::from_str(&details_json).context("Invalid settlement_details JSON")?;

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            description: row.get("description"),
            amount_cents: row.get("amount_cents"),
            paid_by: paid_by_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid paid_by ID")?,
            split_among,
            category: row.get("category"),
            date: parse_timestamp(&date_str, "date")?,
            is_settlement: row.get::<i32, _>("is_settlement") != 0,
            settlement_details,
            is_settled: row.get::<i32, _>("is_settled") != 0,
            settlement_id: settlement_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid settlement ID")?,
        })
    }
}

impl SnapshotStore for Repository {
    async fn load(&self) -> Result<Option<LedgerSnapshot>> {
        if self.last_saved_at().await?.is_none() {
            return Ok(None);
        }

        let participants = self.load_participants().await?;
        let expenses = self.load_expenses().await?;
        debug!(
            participants = participants.len(),
            expenses = expenses.len(),
            "loaded ledger snapshot"
        );

        Ok(Some(LedgerSnapshot {
            participants,
            expenses,
        }))
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM expenses")
            .execute(&mut *tx)
            .await
            .context("Failed to clear expenses")?;
        sqlx::query("DELETE FROM participants")
            .execute(&mut *tx)
            .await
            .context("Failed to clear participants")?;

        for (position, participant) in snapshot.participants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO participants (id, position, name, email, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(participant.id.to_string())
            .bind(position as i64)
            .bind(&participant.name)
            .bind(&participant.email)
            .bind(participant.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to save participant")?;
        }

        for (position, expense) in snapshot.expenses.iter().enumerate() {
            let split_json = serde_json::to_string(&expense.split_among)?;
            let details_json = serde_json::to_string(&expense.settlement_details)?;

            sqlx::query(
                r#"
                INSERT INTO expenses (id, position, description, amount_cents, paid_by, split_among, category, date, is_settlement, settlement_details, is_settled, settlement_id)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(expense.id.to_string())
            .bind(position as i64)
            .bind(&expense.description)
            .bind(expense.amount_cents)
            .bind(expense.paid_by.map(|id| id.to_string()))
            .bind(&split_json)
            .bind(&expense.category)
            .bind(expense.date.to_rfc3339())
            .bind(expense.is_settlement)
            .bind(&details_json)
            .bind(expense.is_settled)
            .bind(expense.settlement_id.map(|id| id.to_string()))
            .execute(&mut *tx)
            .await
            .context("Failed to save expense")?;
        }

        sqlx::query(
            r#"
            INSERT INTO ledger_meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(SAVED_AT_KEY)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to update ledger metadata")?;

        tx.commit().await.context("Failed to commit snapshot")?;

        debug!(
            participants = snapshot.participants.len(),
            expenses = snapshot.expenses.len(),
            "saved ledger snapshot"
        );
        Ok(())
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid {} timestamp", field))?
        .with_timezone(&Utc))
}
