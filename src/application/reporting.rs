use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Cents, Expense, ExpenseId, Ledger, ParticipantId, Settlement, SettlementId, active_total,
};

/// Headline numbers for the whole ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub participant_count: usize,
    /// Expenses ever recorded, settled or not (settlement records excluded)
    pub expense_count: usize,
    pub active_expense_count: usize,
    pub settlement_count: usize,
    /// Sum of every recorded expense, settled ones included
    pub total_expenses: Cents,
    /// Sum of the expenses that still count towards balances
    pub active_total: Cents,
    pub last_settlement: Option<DateTime<Utc>>,
}

/// A payment with participant names resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLine {
    pub from_participant: ParticipantId,
    pub from_name: String,
    pub to_participant: ParticipantId,
    pub to_name: String,
    pub amount_cents: Cents,
}

/// One row of the expense history, names resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: ExpenseId,
    pub date: DateTime<Utc>,
    pub description: String,
    pub category: Option<String>,
    pub amount_cents: Cents,
    pub payer_name: Option<String>,
    pub split_names: Vec<String>,
    pub share_per_person: Option<Cents>,
    pub is_settlement: bool,
    pub is_settled: bool,
    pub settlement_id: Option<SettlementId>,
    /// Only populated for settlement records
    pub payments: Vec<PaymentLine>,
}

/// Sum of all recorded expenses, settled or not, skipping settlement
/// records.
pub fn total_expenses(expenses: &[Expense]) -> Cents {
    expenses
        .iter()
        .filter(|e| !e.is_settlement)
        .map(|e| e.amount_cents)
        .sum()
}

pub fn summarize(ledger: &Ledger) -> LedgerSummary {
    let expenses = ledger.expenses();
    let settlements: Vec<&Expense> = expenses.iter().filter(|e| e.is_settlement).collect();

    LedgerSummary {
        participant_count: ledger.participants().len(),
        expense_count: expenses.len() - settlements.len(),
        active_expense_count: expenses.iter().filter(|e| e.is_active()).count(),
        settlement_count: settlements.len(),
        total_expenses: total_expenses(expenses),
        active_total: active_total(expenses),
        last_settlement: settlements.iter().map(|e| e.date).max(),
    }
}

/// Resolve participant names for a list of payments.
pub fn describe_payments(ledger: &Ledger, payments: &[Settlement]) -> Vec<PaymentLine> {
    payments
        .iter()
        .map(|p| PaymentLine {
            from_participant: p.from_participant,
            from_name: ledger.participant_name(p.from_participant).to_string(),
            to_participant: p.to_participant,
            to_name: ledger.participant_name(p.to_participant).to_string(),
            amount_cents: p.amount_cents,
        })
        .collect()
}

/// Expense history, newest first. Entries sharing a date are listed most
/// recently recorded first.
pub fn history(ledger: &Ledger) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = ledger
        .expenses()
        .iter()
        .rev()
        .map(|expense| HistoryEntry {
            id: expense.id,
            date: expense.date,
            description: expense.description.clone(),
            category: expense.category.clone(),
            amount_cents: expense.amount_cents,
            payer_name: expense
                .paid_by
                .map(|id| ledger.participant_name(id).to_string()),
            split_names: expense
                .split_among
                .iter()
                .map(|id| ledger.participant_name(*id).to_string())
                .collect(),
            share_per_person: expense.share_per_person(),
            is_settlement: expense.is_settlement,
            is_settled: expense.is_settled,
            settlement_id: expense.settlement_id,
            payments: describe_payments(ledger, &expense.settlement_details),
        })
        .collect();

    entries.sort_by(|a, b| b.date.cmp(&a.date));
    entries
}
