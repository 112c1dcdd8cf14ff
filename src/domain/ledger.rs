use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Expense, ExpenseError, ExpenseId, ExpenseUpdate, NewExpense, Participant, ParticipantBalance,
    ParticipantId, Settlement, SettlementId, compute_balances, plan_settlements, settle_up,
    validate_expense,
};

/// Name shown for ids that no longer resolve to a participant.
pub const UNKNOWN_PARTICIPANT: &str = "Unknown";

/// Plain-data copy of the ledger handed to persistence stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.expenses.is_empty()
    }
}

/// What a participant removal took with it.
#[derive(Debug, Clone)]
pub struct ParticipantRemoval {
    pub participant: Participant,
    /// Expenses deleted because the participant paid for them, or because
    /// the participant was the last member of their split
    pub deleted_expenses: Vec<ExpenseId>,
    /// Expenses that only lost the participant from their split
    pub pruned_expenses: Vec<ExpenseId>,
}

/// The authoritative set of participants and expenses.
///
/// Mutations on unknown ids do nothing and report `None`/`false` rather
/// than failing. Invalid input is rejected before anything changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    participants: Vec<Participant>,
    expenses: Vec<Expense>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            participants: snapshot.participants,
            expenses: snapshot.expenses,
        }
    }

    pub fn to_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            participants: self.participants.clone(),
            expenses: self.expenses.clone(),
        }
    }

    // ========================
    // Queries
    // ========================

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn expense(&self, id: ExpenseId) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id)
    }

    pub fn has_participant(&self, id: ParticipantId) -> bool {
        self.participant(id).is_some()
    }

    /// Display name for an id, falling back to "Unknown".
    pub fn participant_name(&self, id: ParticipantId) -> &str {
        self.participant(id)
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_PARTICIPANT)
    }

    /// Current balances, recomputed from the full expense log.
    pub fn balances(&self) -> Vec<ParticipantBalance> {
        compute_balances(&self.participants, &self.expenses)
    }

    /// Payments that would settle the current balances.
    pub fn plan_settlements(&self) -> Vec<Settlement> {
        plan_settlements(&self.balances())
    }

    // ========================
    // Participant mutations
    // ========================

    pub fn add_participant(&mut self, name: &str) -> Result<Participant, ExpenseError> {
        self.insert_participant(name, None)
    }

    pub fn add_participant_with_email(
        &mut self,
        name: &str,
        email: &str,
    ) -> Result<Participant, ExpenseError> {
        let email = email.trim();
        let email = (!email.is_empty()).then_some(email);
        self.insert_participant(name, email)
    }

    fn insert_participant(
        &mut self,
        name: &str,
        email: Option<&str>,
    ) -> Result<Participant, ExpenseError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExpenseError::BlankName);
        }

        let mut participant = Participant::new(name);
        if let Some(email) = email {
            participant = participant.with_email(email);
        }
        self.participants.push(participant.clone());
        Ok(participant)
    }

    /// Remove a participant and clean up the expenses that referenced them.
    ///
    /// Expenses they paid for are deleted outright, even when others shared
    /// them. Otherwise they are dropped from the split, and an expense whose
    /// split ends up empty is deleted too. Settlement records are left as
    /// they are.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<ParticipantRemoval> {
        let position = self.participants.iter().position(|p| p.id == id)?;
        let participant = self.participants.remove(position);

        let mut deleted_expenses = Vec::new();
        let mut pruned_expenses = Vec::new();

        self.expenses.retain_mut(|expense| {
            if expense.is_settlement {
                return true;
            }
            if expense.paid_by == Some(id) {
                deleted_expenses.push(expense.id);
                return false;
            }
            let before = expense.split_among.len();
            expense.split_among.retain(|member| *member != id);
            if expense.split_among.is_empty() {
                deleted_expenses.push(expense.id);
                return false;
            }
            if expense.split_among.len() != before {
                pruned_expenses.push(expense.id);
            }
            true
        });

        Some(ParticipantRemoval {
            participant,
            deleted_expenses,
            pruned_expenses,
        })
    }

    // ========================
    // Expense mutations
    // ========================

    /// Record a new expense dated now.
    pub fn add_expense(&mut self, new: NewExpense) -> Result<Expense, ExpenseError> {
        self.add_expense_at(new, Utc::now())
    }

    /// Record a new expense with an explicit date.
    pub fn add_expense_at(
        &mut self,
        new: NewExpense,
        date: DateTime<Utc>,
    ) -> Result<Expense, ExpenseError> {
        validate_expense(
            &new.description,
            new.amount_cents,
            new.paid_by,
            &new.split_among,
            |id| self.has_participant(id),
        )?;

        let mut expense = Expense::new(
            new.description.trim(),
            new.amount_cents,
            new.paid_by,
            new.split_among,
            date,
        );
        if let Some(category) = new.category.filter(|c| !c.trim().is_empty()) {
            expense = expense.with_category(category.trim());
        }

        self.expenses.push(expense.clone());
        Ok(expense)
    }

    /// Remove an expense. Removing a settlement record leaves the expenses
    /// it settled as settled, without a settlement id.
    pub fn remove_expense(&mut self, id: ExpenseId) -> Option<Expense> {
        let position = self.expenses.iter().position(|e| e.id == id)?;
        let removed = self.expenses.remove(position);
        if removed.is_settlement {
            for expense in &mut self.expenses {
                if expense.settlement_id == Some(id) {
                    expense.settlement_id = None;
                }
            }
        }
        Some(removed)
    }

    /// Merge `update` into an existing expense.
    ///
    /// Returns `Ok(None)` for an unknown id. The merged expense must pass the
    /// same checks as a new one; settled history cannot be edited.
    pub fn update_expense(
        &mut self,
        id: ExpenseId,
        update: &ExpenseUpdate,
    ) -> Result<Option<Expense>, ExpenseError> {
        let Some(position) = self.expenses.iter().position(|e| e.id == id) else {
            return Ok(None);
        };

        let current = &self.expenses[position];
        if !current.is_active() {
            return Err(ExpenseError::AlreadySettled(id));
        }

        let merged = update.merged_into(current);
        let paid_by = merged.paid_by.ok_or(ExpenseError::MissingPayer)?;
        validate_expense(
            &merged.description,
            merged.amount_cents,
            paid_by,
            &merged.split_among,
            |pid| self.has_participant(pid),
        )?;

        self.expenses[position] = merged.clone();
        Ok(Some(merged))
    }

    // ========================
    // Settling
    // ========================

    /// Plan and commit a settlement of every active expense.
    /// Returns None when everyone is already even.
    pub fn settle_up(&mut self) -> Option<(SettlementId, Vec<Settlement>)> {
        let plan = self.plan_settlements();
        let id = settle_up(self, &plan, Utc::now())?;
        Some((id, plan))
    }

    pub(crate) fn expenses_mut(&mut self) -> &mut Vec<Expense> {
        &mut self.expenses
    }

    /// Forget every participant and expense.
    pub fn clear(&mut self) {
        self.participants.clear();
        self.expenses.clear();
    }
}
