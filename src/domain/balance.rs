use std::collections::HashMap;

use super::{Cents, Expense, Participant, ParticipantBalance, ParticipantId, split_evenly};

/// Shares of an expense per participant, summing exactly to its amount.
///
/// Each member owes `amount / n`; leftover cents go to the members with the
/// smallest ids, so the result does not depend on how `split_among` is
/// ordered.
pub fn expense_shares(expense: &Expense) -> Vec<(ParticipantId, Cents)> {
    let mut members = expense.split_among.clone();
    members.sort();
    members.dedup();

    let shares = split_evenly(expense.amount_cents, members.len());
    members.into_iter().zip(shares).collect()
}

/// Derive every participant's paid/owed/net totals from the expense log.
///
/// Only active expenses count: settled expenses and settlement records are
/// history. Output follows the order of `participants`.
pub fn compute_balances(
    participants: &[Participant],
    expenses: &[Expense],
) -> Vec<ParticipantBalance> {
    let mut paid: HashMap<ParticipantId, Cents> = HashMap::new();
    let mut owed: HashMap<ParticipantId, Cents> = HashMap::new();

    for expense in expenses.iter().filter(|e| e.is_active()) {
        if let Some(payer) = expense.paid_by {
            *paid.entry(payer).or_insert(0) += expense.amount_cents;
        }
        for (member, share) in expense_shares(expense) {
            *owed.entry(member).or_insert(0) += share;
        }
    }

    participants
        .iter()
        .map(|participant| {
            let total_paid = paid.get(&participant.id).copied().unwrap_or(0);
            let total_owed = owed.get(&participant.id).copied().unwrap_or(0);
            ParticipantBalance {
                participant: participant.clone(),
                total_paid,
                total_owed,
                balance: total_paid - total_owed,
            }
        })
        .collect()
}

/// Sum of the amounts that still count towards balances.
pub fn active_total(expenses: &[Expense]) -> Cents {
    expenses
        .iter()
        .filter(|e| e.is_active())
        .map(|e| e.amount_cents)
        .sum()
}
