use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ParticipantId, Settlement};

pub type ExpenseId = Uuid;

/// Settlement ids are the ids of the synthetic settlement records.
pub type SettlementId = ExpenseId;

/// Largest amount a single expense may carry (ten trillion in major units).
/// Keeps every balance sum far inside `i64`.
pub const MAX_AMOUNT_CENTS: Cents = 1_000_000_000_000_000;

/// An entry in the shared expense log.
///
/// Regular expenses have a payer and a non-empty split. A settlement record
/// (`is_settlement`) has neither: its amount is zero and the payments it
/// recorded live in `settlement_details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount_cents: Cents,
    /// None only on settlement records
    pub paid_by: Option<ParticipantId>,
    pub split_among: Vec<ParticipantId>,
    #[serde(default)]
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub is_settlement: bool,
    #[serde(default)]
    pub settlement_details: Vec<Settlement>,
    #[serde(default)]
    pub is_settled: bool,
    #[serde(default)]
    pub settlement_id: Option<SettlementId>,
}

impl Expense {
    /// Build an active expense. Inputs are expected to be validated already,
    /// see [`validate_expense`].
    pub fn new(
        description: impl Into<String>,
        amount_cents: Cents,
        paid_by: ParticipantId,
        split_among: Vec<ParticipantId>,
        date: DateTime<Utc>,
    ) -> Self {
        assert!(amount_cents > 0, "Expense amount must be positive");
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount_cents,
            paid_by: Some(paid_by),
            split_among: dedup_ids(split_among),
            category: None,
            date,
            is_settlement: false,
            settlement_details: Vec::new(),
            is_settled: false,
            settlement_id: None,
        }
    }

    /// Build the audit record for a committed settlement plan.
    pub fn settlement_record(
        id: SettlementId,
        details: Vec<Settlement>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            description: format!("Settlement: {} payment(s)", details.len()),
            amount_cents: 0,
            paid_by: None,
            split_among: Vec::new(),
            category: None,
            date,
            is_settlement: true,
            settlement_details: details,
            is_settled: false,
            settlement_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// True when the expense still counts towards balances.
    pub fn is_active(&self) -> bool {
        !self.is_settled && !self.is_settlement
    }

    /// Per-person share for display, or None for settlement records.
    /// Uneven splits report the smaller share.
    pub fn share_per_person(&self) -> Option<Cents> {
        if self.split_among.is_empty() {
            None
        } else {
            Some(self.amount_cents / self.split_among.len() as i64)
        }
    }

    /// Sum of the transfers recorded by a settlement record.
    pub fn settled_total(&self) -> Cents {
        self.settlement_details.iter().map(|s| s.amount_cents).sum()
    }
}

/// Fields a caller supplies to record a new expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub description: String,
    pub amount_cents: Cents,
    pub paid_by: ParticipantId,
    pub split_among: Vec<ParticipantId>,
    pub category: Option<String>,
}

impl NewExpense {
    pub fn new(
        description: impl Into<String>,
        amount_cents: Cents,
        paid_by: ParticipantId,
        split_among: Vec<ParticipantId>,
    ) -> Self {
        Self {
            description: description.into(),
            amount_cents,
            paid_by,
            split_among,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Shallow patch for an existing expense. `None` leaves a field unchanged;
/// `category: Some(None)` clears the category.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub description: Option<String>,
    pub amount_cents: Option<Cents>,
    pub paid_by: Option<ParticipantId>,
    pub split_among: Option<Vec<ParticipantId>>,
    pub category: Option<Option<String>>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount_cents.is_none()
            && self.paid_by.is_none()
            && self.split_among.is_none()
            && self.category.is_none()
    }

    /// Apply the patch to a copy of `expense`.
    pub fn merged_into(&self, expense: &Expense) -> Expense {
        let mut merged = expense.clone();
        if let Some(description) = &self.description {
            merged.description = description.trim().to_string();
        }
        if let Some(amount) = self.amount_cents {
            merged.amount_cents = amount;
        }
        if let Some(paid_by) = self.paid_by {
            merged.paid_by = Some(paid_by);
        }
        if let Some(split) = &self.split_among {
            merged.split_among = dedup_ids(split.clone());
        }
        if let Some(category) = &self.category {
            merged.category = category.clone();
        }
        merged
    }
}

/// Check the rules every active expense must satisfy. `is_known` reports
/// whether a participant id exists in the ledger.
pub fn validate_expense(
    description: &str,
    amount_cents: Cents,
    paid_by: ParticipantId,
    split_among: &[ParticipantId],
    is_known: impl Fn(ParticipantId) -> bool,
) -> Result<(), ExpenseError> {
    if amount_cents <= 0 {
        return Err(ExpenseError::InvalidAmount(amount_cents));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(ExpenseError::AmountTooLarge(amount_cents));
    }
    if description.trim().is_empty() {
        return Err(ExpenseError::BlankDescription);
    }
    if split_among.is_empty() {
        return Err(ExpenseError::EmptySplit);
    }
    if !is_known(paid_by) {
        return Err(ExpenseError::UnknownParticipant(paid_by));
    }
    if let Some(unknown) = split_among.iter().copied().find(|id| !is_known(*id)) {
        return Err(ExpenseError::UnknownParticipant(unknown));
    }
    Ok(())
}

/// Collapse repeated ids, keeping first occurrences in order.
pub(crate) fn dedup_ids(ids: Vec<ParticipantId>) -> Vec<ParticipantId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseError {
    InvalidAmount(Cents),
    AmountTooLarge(Cents),
    BlankDescription,
    EmptySplit,
    MissingPayer,
    UnknownParticipant(ParticipantId),
    BlankName,
    AlreadySettled(ExpenseId),
}

impl std::fmt::Display for ExpenseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpenseError::InvalidAmount(amount) => {
                write!(f, "Amount must be positive (got {} cents)", amount)
            }
            ExpenseError::AmountTooLarge(amount) => write!(
                f,
                "Amount is too large (got {} cents, limit is {})",
                amount, MAX_AMOUNT_CENTS
            ),
            ExpenseError::BlankDescription => write!(f, "Description must not be blank"),
            ExpenseError::EmptySplit => {
                write!(f, "An expense must be split among at least one participant")
            }
            ExpenseError::MissingPayer => write!(f, "An expense must have a payer"),
            ExpenseError::UnknownParticipant(id) => write!(f, "Unknown participant: {}", id),
            ExpenseError::BlankName => write!(f, "Participant name must not be blank"),
            ExpenseError::AlreadySettled(id) => {
                write!(f, "Expense {} is settled history and cannot be changed", id)
            }
        }
    }
}

impl std::error::Error for ExpenseError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<ParticipantId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_new_expense_is_active() {
        let people = ids(2);
        let expense = Expense::new("Lunch", 2000, people[0], people.clone(), Utc::now())
            .with_category("food");

        assert!(expense.is_active());
        assert_eq!(expense.paid_by, Some(people[0]));
        assert_eq!(expense.category.as_deref(), Some("food"));
        assert_eq!(expense.share_per_person(), Some(1000));
    }

    #[test]
    fn test_new_expense_collapses_duplicate_split_ids() {
        let people = ids(2);
        let split = vec![people[0], people[1], people[0]];
        let expense = Expense::new("Taxi", 900, people[0], split, Utc::now());

        assert_eq!(expense.split_among, people);
    }

    #[test]
    #[should_panic(expected = "Expense amount must be positive")]
    fn test_expense_requires_positive_amount() {
        let people = ids(1);
        Expense::new("Nothing", 0, people[0], people.clone(), Utc::now());
    }

    #[test]
    fn test_settlement_record_shape() {
        let people = ids(2);
        let details = vec![Settlement::new(people[1], people[0], 1000)];
        let id = Uuid::new_v4();
        let record = Expense::settlement_record(id, details.clone(), Utc::now());

        assert_eq!(record.id, id);
        assert!(record.is_settlement);
        assert!(!record.is_active());
        assert_eq!(record.amount_cents, 0);
        assert_eq!(record.paid_by, None);
        assert!(record.split_among.is_empty());
        assert_eq!(record.settlement_details, details);
        assert_eq!(record.description, "Settlement: 1 payment(s)");
        assert_eq!(record.settled_total(), 1000);
        assert_eq!(record.share_per_person(), None);
    }

    #[test]
    fn test_validate_expense_rules() {
        let people = ids(2);
        let known = |id: ParticipantId| people.contains(&id);

        assert!(validate_expense("Lunch", 100, people[0], &people, known).is_ok());
        assert_eq!(
            validate_expense("Lunch", 0, people[0], &people, known),
            Err(ExpenseError::InvalidAmount(0))
        );
        assert_eq!(
            validate_expense("Lunch", -5, people[0], &people, known),
            Err(ExpenseError::InvalidAmount(-5))
        );
        assert!(validate_expense("Lunch", MAX_AMOUNT_CENTS, people[0], &people, known).is_ok());
        assert_eq!(
            validate_expense("Lunch", MAX_AMOUNT_CENTS + 1, people[0], &people, known),
            Err(ExpenseError::AmountTooLarge(MAX_AMOUNT_CENTS + 1))
        );
        assert_eq!(
            validate_expense("   ", 100, people[0], &people, known),
            Err(ExpenseError::BlankDescription)
        );
        assert_eq!(
            validate_expense("Lunch", 100, people[0], &[], known),
            Err(ExpenseError::EmptySplit)
        );

        let stranger = Uuid::new_v4();
        assert_eq!(
            validate_expense("Lunch", 100, stranger, &people, known),
            Err(ExpenseError::UnknownParticipant(stranger))
        );
        assert_eq!(
            validate_expense("Lunch", 100, people[0], &[people[1], stranger], known),
            Err(ExpenseError::UnknownParticipant(stranger))
        );
    }

    #[test]
    fn test_update_merges_only_supplied_fields() {
        let people = ids(3);
        let expense = Expense::new("Dinner", 3000, people[0], people.clone(), Utc::now())
            .with_category("food");

        let update = ExpenseUpdate {
            amount_cents: Some(4500),
            split_among: Some(vec![people[1], people[2], people[1]]),
            category: Some(None),
            ..Default::default()
        };
        let merged = update.merged_into(&expense);

        assert_eq!(merged.id, expense.id);
        assert_eq!(merged.description, "Dinner");
        assert_eq!(merged.amount_cents, 4500);
        assert_eq!(merged.paid_by, Some(people[0]));
        assert_eq!(merged.split_among, vec![people[1], people[2]]);
        assert_eq!(merged.category, None);
        assert!(!update.is_empty());
        assert!(ExpenseUpdate::default().is_empty());
    }
}
