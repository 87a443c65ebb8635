//! Domain errors raised by the shared rules

use rust_decimal::Decimal;
use thiserror::Error;

/// An illegal status change on a plot or request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{entity} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
}

/// Failures of the investor funding ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error(
        "Investor {investor} has insufficient balance. Available: ${available:.2}, Requested: ${requested:.2}"
    )]
    InsufficientBalance {
        investor: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Payment amount cannot be negative")]
    NegativeAmount,

    #[error("Total payment amount must be greater than 0")]
    EmptyPayment,

    #[error("Total invested cannot be negative")]
    NegativeCommitment,

    #[error("Amount cannot exceed 9999999999999.99")]
    AmountOutOfRange,
}

/// Failures while turning user input into a set of plot numbers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlotNumberError {
    #[error("Number of plot numbers ({given}) must match quantity ({quantity})")]
    CountMismatch { given: usize, quantity: i32 },

    #[error("Duplicate plot numbers: {0}")]
    Duplicates(String),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    #[error("Plot number is longer than 100 characters: {0}")]
    TooLong(String),
}
