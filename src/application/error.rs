use thiserror::Error;

use crate::domain::{ExpenseError, ExpenseId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Participant name '{0}' is ambiguous, use the participant ID instead")]
    AmbiguousParticipant(String),

    #[error("Expense not found: {0}")]
    ExpenseNotFound(ExpenseId),

    #[error("Invalid expense: {0}")]
    InvalidExpense(#[from] ExpenseError),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
