use std::collections::HashSet;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    Cents, Expense, ExpenseId, ExpenseUpdate, Ledger, LedgerSnapshot, NewExpense, Participant,
    ParticipantBalance, ParticipantId, ParticipantRemoval, Settlement, SettlementId,
    validate_expense,
};
use crate::storage::{Repository, SnapshotStore};

use super::reporting::{self, HistoryEntry, LedgerSummary, PaymentLine};
use super::AppError;

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
///
/// The in-memory ledger is the source of truth for the session. After each
/// mutation a snapshot is handed to the store; a failed save is logged and
/// otherwise ignored, and never undoes the mutation.
pub struct LedgerService<S: SnapshotStore = Repository> {
    ledger: Ledger,
    store: S,
}

/// Result of settling up
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub settlement_id: SettlementId,
    pub payments: Vec<Settlement>,
    pub settled_expenses: usize,
}

impl LedgerService<Repository> {
    /// Initialize a database at the given path, creating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Self::open(repo).await
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        repo.migrate().await?;
        Self::open(repo).await
    }
}

impl<S: SnapshotStore> LedgerService<S> {
    /// Load the last saved snapshot from `store`, or start empty.
    pub async fn open(store: S) -> Result<Self, AppError> {
        let snapshot = store.load().await?.unwrap_or_default();
        debug!(
            participants = snapshot.participants.len(),
            expenses = snapshot.expenses.len(),
            "opened ledger"
        );
        Ok(Self {
            ledger: Ledger::from_snapshot(snapshot),
            store,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn persist(&self) {
        if let Err(err) = self.store.save(&self.ledger.to_snapshot()).await {
            warn!(error = %format!("{:#}", err), "failed to save ledger snapshot");
        }
    }

    // ========================
    // Participant operations
    // ========================

    pub async fn add_participant(
        &mut self,
        name: &str,
        email: Option<&str>,
    ) -> Result<Participant, AppError> {
        let participant = match email {
            Some(email) => self.ledger.add_participant_with_email(name, email)?,
            None => self.ledger.add_participant(name)?,
        };
        info!(id = %participant.id, name = %participant.name, "added participant");
        self.persist().await;
        Ok(participant)
    }

    /// Remove a participant and the expenses that depended on them.
    /// Unknown ids are ignored.
    pub async fn remove_participant(&mut self, id: ParticipantId) -> Option<ParticipantRemoval> {
        let removal = self.ledger.remove_participant(id)?;
        info!(
            id = %id,
            deleted_expenses = removal.deleted_expenses.len(),
            pruned_expenses = removal.pruned_expenses.len(),
            "removed participant"
        );
        self.persist().await;
        Some(removal)
    }

    pub fn list_participants(&self) -> &[Participant] {
        self.ledger.participants()
    }

    /// Find a participant by ID, or by name when the name is unique.
    pub fn find_participant(&self, name_or_id: &str) -> Result<&Participant, AppError> {
        if let Ok(id) = Uuid::parse_str(name_or_id) {
            if let Some(participant) = self.ledger.participant(id) {
                return Ok(participant);
            }
        }

        let wanted = name_or_id.trim();
        let mut matches = self
            .ledger
            .participants()
            .iter()
            .filter(|p| p.name.eq_ignore_ascii_case(wanted));

        match (matches.next(), matches.next()) {
            (Some(participant), None) => Ok(participant),
            (Some(_), Some(_)) => Err(AppError::AmbiguousParticipant(wanted.to_string())),
            (None, _) => Err(AppError::ParticipantNotFound(wanted.to_string())),
        }
    }

    // ========================
    // Expense operations
    // ========================

    pub async fn add_expense(&mut self, new: NewExpense) -> Result<Expense, AppError> {
        let expense = self.ledger.add_expense(new)?;
        info!(
            id = %expense.id,
            amount_cents = expense.amount_cents,
            split = expense.split_among.len(),
            "added expense"
        );
        self.persist().await;
        Ok(expense)
    }

    /// Remove an expense. Unknown ids are ignored.
    pub async fn remove_expense(&mut self, id: ExpenseId) -> Option<Expense> {
        let expense = self.ledger.remove_expense(id)?;
        info!(id = %id, "removed expense");
        self.persist().await;
        Some(expense)
    }

    /// Patch an expense. Returns `Ok(None)` for unknown ids.
    pub async fn update_expense(
        &mut self,
        id: ExpenseId,
        update: &ExpenseUpdate,
    ) -> Result<Option<Expense>, AppError> {
        let Some(expense) = self.ledger.update_expense(id, update)? else {
            return Ok(None);
        };
        info!(id = %id, "updated expense");
        self.persist().await;
        Ok(Some(expense))
    }

    pub fn get_expense(&self, id: ExpenseId) -> Result<&Expense, AppError> {
        self.ledger.expense(id).ok_or(AppError::ExpenseNotFound(id))
    }

    pub fn list_expenses(&self) -> &[Expense] {
        self.ledger.expenses()
    }

    // ========================
    // Balances and settling
    // ========================

    pub fn balances(&self) -> Vec<ParticipantBalance> {
        let balances = self.ledger.balances();
        debug!(participants = balances.len(), "recomputed balances");
        balances
    }

    pub fn settlement_plan(&self) -> Vec<Settlement> {
        self.ledger.plan_settlements()
    }

    /// The current plan with participant names resolved.
    pub fn describe_plan(&self) -> Vec<PaymentLine> {
        reporting::describe_payments(&self.ledger, &self.settlement_plan())
    }

    /// Settle every active expense. Returns None when everyone is already
    /// even.
    pub async fn settle_up(&mut self) -> Option<SettlementOutcome> {
        let settled_expenses = self
            .ledger
            .expenses()
            .iter()
            .filter(|e| e.is_active())
            .count();

        let (settlement_id, payments) = self.ledger.settle_up()?;
        info!(
            id = %settlement_id,
            payments = payments.len(),
            settled_expenses,
            "settled up"
        );
        self.persist().await;

        Some(SettlementOutcome {
            settlement_id,
            payments,
            settled_expenses,
        })
    }

    // ========================
    // Reporting
    // ========================

    pub fn total_expenses(&self) -> Cents {
        reporting::total_expenses(self.ledger.expenses())
    }

    pub fn summary(&self) -> LedgerSummary {
        reporting::summarize(&self.ledger)
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        reporting::history(&self.ledger)
    }

    pub fn participant_name(&self, id: ParticipantId) -> &str {
        self.ledger.participant_name(id)
    }

    // ========================
    // Whole-ledger operations
    // ========================

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.ledger.to_snapshot()
    }

    /// Replace the ledger with `snapshot` after checking it is consistent.
    pub async fn replace_snapshot(&mut self, snapshot: LedgerSnapshot) -> Result<(), AppError> {
        validate_snapshot(&snapshot)?;
        info!(
            participants = snapshot.participants.len(),
            expenses = snapshot.expenses.len(),
            "replaced ledger"
        );
        self.ledger = Ledger::from_snapshot(snapshot);
        self.persist().await;
        Ok(())
    }

    /// Forget all participants and expenses.
    pub async fn clear(&mut self) {
        self.ledger.clear();
        info!("cleared ledger");
        self.persist().await;
    }
}

/// Check that a snapshot could have been produced by the ledger itself:
/// unique ids, expenses (settled or not) that pass validation and point at
/// existing settlement records, and well-formed settlement records.
pub fn validate_snapshot(snapshot: &LedgerSnapshot) -> Result<(), AppError> {
    let mut participant_ids = HashSet::new();
    for participant in &snapshot.participants {
        if !participant_ids.insert(participant.id) {
            return Err(AppError::InvalidSnapshot(format!(
                "duplicate participant id {}",
                participant.id
            )));
        }
        if participant.name.trim().is_empty() {
            return Err(AppError::InvalidSnapshot(format!(
                "participant {} has a blank name",
                participant.id
            )));
        }
    }

    let settlement_ids: HashSet<_> = snapshot
        .expenses
        .iter()
        .filter(|e| e.is_settlement)
        .map(|e| e.id)
        .collect();

    let mut expense_ids = HashSet::new();
    for expense in &snapshot.expenses {
        if !expense_ids.insert(expense.id) {
            return Err(AppError::InvalidSnapshot(format!(
                "duplicate expense id {}",
                expense.id
            )));
        }

        if expense.is_settlement {
            let well_formed = expense.amount_cents == 0
                && expense.paid_by.is_none()
                && expense.split_among.is_empty()
                && expense.settlement_details.iter().all(|s| s.amount_cents > 0);
            if !well_formed {
                return Err(AppError::InvalidSnapshot(format!(
                    "settlement record {} is malformed",
                    expense.id
                )));
            }
            continue;
        }

        if let Some(settlement_id) = expense.settlement_id {
            if !settlement_ids.contains(&settlement_id) {
                return Err(AppError::InvalidSnapshot(format!(
                    "expense {} refers to missing settlement {}",
                    expense.id, settlement_id
                )));
            }
        }

        // Applies to settled expenses too
        let paid_by = expense.paid_by.ok_or_else(|| {
            AppError::InvalidSnapshot(format!("expense {} has no payer", expense.id))
        })?;
        validate_expense(
            &expense.description,
            expense.amount_cents,
            paid_by,
            &expense.split_among,
            |id| participant_ids.contains(&id),
        )
        .map_err(|e| AppError::InvalidSnapshot(format!("expense {}: {}", expense.id, e)))?;
    }

    Ok(())
}
