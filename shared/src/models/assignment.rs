//! Plot assignment records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable audit entry written once per assignment transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotAssignment {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub salesperson_id: Uuid,
    pub assignment_date: NaiveDate,
    pub total_plots_assigned: i32,
    pub total_amount: Decimal,
    /// Initial payment captured at assignment time; investor payments are authoritative
    pub amount_paid: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Result of assigning a set of plots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSummary {
    pub plots_assigned: i32,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub remaining_balance: Decimal,
}

impl AssignmentSummary {
    pub fn new(plots_assigned: usize, price_per_plot: Decimal, amount_paid: Decimal) -> Self {
        let total_amount = Decimal::from(plots_assigned as u64) * price_per_plot;
        Self {
            plots_assigned: plots_assigned as i32,
            total_amount,
            amount_paid,
            remaining_balance: total_amount - amount_paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_amounts() {
        let summary = AssignmentSummary::new(3, Decimal::from(10_000), Decimal::from(2_500));
        assert_eq!(summary.plots_assigned, 3);
        assert_eq!(summary.total_amount, Decimal::from(30_000));
        assert_eq!(summary.remaining_balance, Decimal::from(27_500));
    }
}
