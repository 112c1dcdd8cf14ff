use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type ParticipantId = Uuid;

/// Someone who pays for or shares in expenses.
///
/// Totals and balances are not stored here; they are derived from the
/// expense log by [`compute_balances`](super::compute_balances).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// A participant together with the totals derived from unsettled expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantBalance {
    pub participant: Participant,
    /// Sum of active expenses this participant paid for
    pub total_paid: Cents,
    /// Sum of this participant's shares of active expenses
    pub total_owed: Cents,
    /// total_paid - total_owed: positive is owed money, negative owes money
    pub balance: Cents,
}

impl ParticipantBalance {
    pub fn id(&self) -> ParticipantId {
        self.participant.id
    }

    pub fn is_creditor(&self) -> bool {
        self.balance > 0
    }

    pub fn is_debtor(&self) -> bool {
        self.balance < 0
    }

    pub fn is_settled(&self) -> bool {
        self.balance == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participants_get_distinct_ids() {
        let a = Participant::new("Alice");
        let b = Participant::new("Alice");

        assert_eq!(a.name, b.name);
        assert_ne!(a.id, b.id);
        assert!(a.email.is_none());
    }

    #[test]
    fn test_with_email() {
        let p = Participant::new("Bob").with_email("bob@example.com");
        assert_eq!(p.email.as_deref(), Some("bob@example.com"));
    }

    #[test]
    fn test_balance_sign_helpers() {
        let p = Participant::new("Carol");
        let entry = |balance| ParticipantBalance {
            participant: p.clone(),
            total_paid: 0,
            total_owed: 0,
            balance,
        };

        assert!(entry(500).is_creditor());
        assert!(entry(-500).is_debtor());
        assert!(entry(0).is_settled());
        assert!(!entry(0).is_creditor() && !entry(0).is_debtor());
    }
}
