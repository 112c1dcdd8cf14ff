use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Cents, ParticipantBalance, ParticipantId};

/// Balances within this many cents of zero count as even.
/// Amounts are exact integers, so any non-zero cent is real money.
pub const TOLERANCE_CENTS: Cents = 0;

/// A payment from a debtor to a creditor, proposed by a plan or recorded
/// by a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Participant who owes money
    pub from_participant: ParticipantId,
    /// Participant who is owed money
    pub to_participant: ParticipantId,
    /// Always positive
    pub amount_cents: Cents,
}

impl Settlement {
    pub fn new(from: ParticipantId, to: ParticipantId, amount_cents: Cents) -> Self {
        assert!(amount_cents > 0, "Settlement amount must be positive");
        Self {
            from_participant: from,
            to_participant: to,
            amount_cents,
        }
    }
}

/// Propose payments that bring every balance back to zero.
///
/// Greedy largest-first matching: creditors ordered from most owed,
/// debtors from most owing, and each step pays off as much as the current
/// pair allows. This is reproducible but not guaranteed to use the fewest
/// possible payments in every multi-party case.
///
/// # Panics
///
/// Panics if the balances do not sum to zero. Balances from
/// [`compute_balances`](super::compute_balances) always do, so a non-zero
/// total means a bug upstream.
pub fn plan_settlements(balances: &[ParticipantBalance]) -> Vec<Settlement> {
    let total: Cents = balances.iter().map(|b| b.balance).sum();
    assert_eq!(
        total, 0,
        "Balances must net to zero before settling (residual {} cents)",
        total
    );

    let mut creditors: Vec<(ParticipantId, Cents)> = balances
        .iter()
        .filter(|b| b.balance > TOLERANCE_CENTS)
        .map(|b| (b.id(), b.balance))
        .collect();
    let mut debtors: Vec<(ParticipantId, Cents)> = balances
        .iter()
        .filter(|b| b.balance < -TOLERANCE_CENTS)
        .map(|b| (b.id(), b.balance))
        .collect();

    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| a.1.cmp(&b.1));

    let mut plan = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < creditors.len() && j < debtors.len() {
        let (creditor_id, creditor_balance) = creditors[i];
        let (debtor_id, debtor_balance) = debtors[j];
        let amount = creditor_balance.min(-debtor_balance);

        if amount > TOLERANCE_CENTS {
            plan.push(Settlement::new(debtor_id, creditor_id, amount));
        }

        creditors[i].1 -= amount;
        debtors[j].1 += amount;

        if creditors[i].1 <= TOLERANCE_CENTS {
            i += 1;
        }
        if debtors[j].1 >= -TOLERANCE_CENTS {
            j += 1;
        }
    }

    plan
}

/// Balances left over after every payment in `plan` is made.
/// Returns participant id -> remaining balance, in no particular order.
pub fn apply_plan(
    balances: &[ParticipantBalance],
    plan: &[Settlement],
) -> HashMap<ParticipantId, Cents> {
    let mut remaining: HashMap<ParticipantId, Cents> =
        balances.iter().map(|b| (b.id(), b.balance)).collect();

    for payment in plan {
        *remaining.entry(payment.from_participant).or_insert(0) += payment.amount_cents;
        *remaining.entry(payment.to_participant).or_insert(0) -= payment.amount_cents;
    }

    remaining
}

/// Total money moved by a plan.
pub fn plan_total(plan: &[Settlement]) -> Cents {
    plan.iter().map(|s| s.amount_cents).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Participant;

    fn entry(name: &str, balance: Cents) -> ParticipantBalance {
        ParticipantBalance {
            participant: Participant::new(name),
            total_paid: balance.max(0),
            total_owed: (-balance).max(0),
            balance,
        }
    }

    #[test]
    fn test_two_people() {
        let balances = vec![entry("P1", 1000), entry("P2", -1000)];
        let plan = plan_settlements(&balances);

        assert_eq!(
            plan,
            vec![Settlement::new(balances[1].id(), balances[0].id(), 1000)]
        );
    }

    #[test]
    fn test_even_participants_are_skipped() {
        let balances = vec![entry("A", 1500), entry("B", 0), entry("C", -1500)];
        let plan = plan_settlements(&balances);

        assert_eq!(
            plan,
            vec![Settlement::new(balances[2].id(), balances[0].id(), 1500)]
        );
    }

    #[test]
    fn test_single_cent_is_still_settled() {
        let balances = vec![entry("A", 1), entry("B", -1)];
        let plan = plan_settlements(&balances);

        assert_eq!(
            plan,
            vec![Settlement::new(balances[1].id(), balances[0].id(), 1)]
        );
        assert_eq!(plan_total(&plan), 1);
    }

    #[test]
    fn test_everyone_even_gives_empty_plan() {
        let balances = vec![entry("A", 0), entry("B", 0)];
        assert!(plan_settlements(&balances).is_empty());
        assert!(plan_settlements(&[]).is_empty());
    }

    #[test]
    fn test_largest_first_ordering() {
        // Creditors: A +50, B +30. Debtors: C -60, D -20.
        let balances = vec![
            entry("B", 3000),
            entry("D", -2000),
            entry("A", 5000),
            entry("C", -6000),
        ];
        let (b, d, a, c) = (
            balances[0].id(),
            balances[1].id(),
            balances[2].id(),
            balances[3].id(),
        );

        let plan = plan_settlements(&balances);

        assert_eq!(
            plan,
            vec![
                Settlement::new(c, a, 5000),
                Settlement::new(c, b, 1000),
                Settlement::new(d, b, 2000),
            ]
        );
    }

    #[test]
    fn test_exact_match_advances_both_cursors() {
        let balances = vec![
            entry("A", 1000),
            entry("B", 500),
            entry("C", -1000),
            entry("D", -500),
        ];
        let plan = plan_settlements(&balances);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].amount_cents, 1000);
        assert_eq!(plan[0].from_participant, balances[2].id());
        assert_eq!(plan[1].amount_cents, 500);
        assert_eq!(plan[1].from_participant, balances[3].id());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let balances = vec![entry("A", 500), entry("B", 500), entry("C", -1000)];
        let plan = plan_settlements(&balances);

        assert_eq!(plan[0].to_participant, balances[0].id());
        assert_eq!(plan[1].to_participant, balances[1].id());
    }

    #[test]
    fn test_applying_plan_zeroes_balances() {
        let balances = vec![
            entry("A", 2534),
            entry("B", -1),
            entry("C", -1200),
            entry("D", 667),
            entry("E", -2000),
        ];
        let plan = plan_settlements(&balances);
        let creditor_total: Cents = balances.iter().map(|b| b.balance.max(0)).sum();

        assert_eq!(plan_total(&plan), creditor_total);
        assert!(apply_plan(&balances, &plan).values().all(|b| *b == 0));
    }

    #[test]
    #[should_panic(expected = "Balances must net to zero")]
    fn test_unbalanced_input_panics() {
        let balances = vec![entry("A", 1000), entry("B", -999)];
        plan_settlements(&balances);
    }

    #[test]
    #[should_panic(expected = "Settlement amount must be positive")]
    fn test_settlement_requires_positive_amount() {
        let a = entry("A", 0);
        Settlement::new(a.id(), a.id(), 0);
    }
}
