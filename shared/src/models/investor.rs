//! Investor models and the funding ledger arithmetic

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::validation::MAX_MONEY_AMOUNT;

/// A private funding source owned by one salesperson
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investor {
    pub id: Uuid,
    pub salesperson_id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total_invested: Decimal,
    /// Cached from the payment ledger
    pub paid_amount: Decimal,
    /// Cached from the payment ledger
    pub remaining_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An investor's position as derived from the payment ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPosition {
    pub total_invested: Decimal,
    pub used: Decimal,
}

impl LedgerPosition {
    pub fn new(total_invested: Decimal, used: Decimal) -> Self {
        Self {
            total_invested,
            used,
        }
    }

    pub fn remaining(&self) -> Decimal {
        self.total_invested - self.used
    }

    /// Check that `amount` can be drawn from this position
    pub fn ensure_can_cover(&self, investor: &str, amount: Decimal) -> Result<(), LedgerError> {
        if amount > self.remaining() {
            return Err(LedgerError::InsufficientBalance {
                investor: investor.to_string(),
                available: self.remaining(),
                requested: amount,
            });
        }
        Ok(())
    }

    /// Position after replacing a recorded payment of `old` with `new`
    pub fn with_replaced_payment(&self, old: Decimal, new: Decimal) -> LedgerPosition {
        LedgerPosition::new(self.total_invested, self.used - old + new)
    }

    /// Check that the commitment can be changed to `total_invested`
    pub fn ensure_commitment(&self, investor: &str, total_invested: Decimal) -> Result<(), LedgerError> {
        if total_invested < Decimal::ZERO {
            return Err(LedgerError::NegativeCommitment);
        }
        if total_invested > MAX_MONEY_AMOUNT {
            return Err(LedgerError::AmountOutOfRange);
        }
        if total_invested < self.used {
            return Err(LedgerError::InsufficientBalance {
                investor: investor.to_string(),
                available: total_invested,
                requested: self.used,
            });
        }
        Ok(())
    }
}

/// Per-investor balance projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorBalance {
    pub investor_id: Uuid,
    pub investor_name: String,
    pub total_invested: Decimal,
    pub used_balance: Decimal,
    pub remaining_balance: Decimal,
}

impl InvestorBalance {
    pub fn new(investor_id: Uuid, investor_name: String, position: LedgerPosition) -> Self {
        Self {
            investor_id,
            investor_name,
            total_invested: position.total_invested,
            used_balance: position.used,
            remaining_balance: position.remaining(),
        }
    }
}

/// Aggregate balance across every investor a salesperson owns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalespersonBalance {
    pub total_invested: Decimal,
    pub total_used: Decimal,
    pub remaining_balance: Decimal,
}

impl SalespersonBalance {
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a LedgerPosition>) -> Self {
        let (total_invested, total_used) = positions
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(inv, used), p| {
                (inv + p.total_invested, used + p.used)
            });
        Self {
            total_invested,
            total_used,
            remaining_balance: total_invested - total_used,
        }
    }
}
