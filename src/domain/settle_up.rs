use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Expense, Ledger, Settlement, SettlementId};

/// Commit a settlement plan to the ledger.
///
/// Every active expense is flagged settled under one new settlement id, and
/// a settlement record carrying the plan is appended as the audit entry.
/// An empty plan changes nothing and returns None.
pub fn settle_up(
    ledger: &mut Ledger,
    plan: &[Settlement],
    now: DateTime<Utc>,
) -> Option<SettlementId> {
    if plan.is_empty() {
        return None;
    }

    let settlement_id: SettlementId = Uuid::new_v4();
    let expenses = ledger.expenses_mut();

    for expense in expenses.iter_mut().filter(|e| e.is_active()) {
        expense.is_settled = true;
        expense.settlement_id = Some(settlement_id);
    }

    expenses.push(Expense::settlement_record(
        settlement_id,
        plan.to_vec(),
        now,
    ));

    Some(settlement_id)
}
