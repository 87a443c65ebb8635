//! Inventory payment ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::validation::MAX_MONEY_AMOUNT;

/// One investor's contribution toward one plot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPayment {
    pub id: Uuid,
    pub inventory_id: Uuid,
    /// Null only on rows written before plots existed
    pub plot_id: Option<Uuid>,
    pub investor_id: Option<Uuid>,
    pub salesperson_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorContribution {
    pub investor_id: Uuid,
    pub amount: Decimal,
}

/// Clean up the contributions of a single payment call.
///
/// Negative amounts are rejected, zero amounts dropped, and repeated
/// investors merged so each investor is balance-checked once against its
/// combined draw. Returns the merged list (first-seen order) and its total.
/// Merged amounts beyond what a payment row can store are rejected.
pub fn normalize_contributions(
    contributions: &[InvestorContribution],
) -> Result<(Vec<InvestorContribution>, Decimal), LedgerError> {
    let mut merged: Vec<InvestorContribution> = Vec::new();

    for c in contributions {
        if c.amount < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount);
        }
        if c.amount.is_zero() {
            continue;
        }
        if c.amount > MAX_MONEY_AMOUNT {
            return Err(LedgerError::AmountOutOfRange);
        }
        match merged.iter_mut().find(|m| m.investor_id == c.investor_id) {
            Some(existing) => {
                existing.amount = existing
                    .amount
                    .checked_add(c.amount)
                    .filter(|sum| *sum <= MAX_MONEY_AMOUNT)
                    .ok_or(LedgerError::AmountOutOfRange)?;
            }
            None => merged.push(c.clone()),
        }
    }

    let total = merged
        .iter()
        .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(c.amount))
        .ok_or(LedgerError::AmountOutOfRange)?;
    if total <= Decimal::ZERO {
        return Err(LedgerError::EmptyPayment);
    }

    Ok((merged, total))
}

/// Contribution totals of one investor toward a unit or plot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorContributionSummary {
    pub investor_id: Option<Uuid>,
    pub investor_name: Option<String>,
    pub plot_id: Option<Uuid>,
    pub plot_number: Option<String>,
    pub total_amount: Decimal,
    pub payment_count: i64,
}

/// Contribution summaries indexed by plot
#[derive(Debug, Clone, Default)]
pub struct InventoryContributionIndex {
    by_plot: HashMap<Uuid, Vec<InvestorContributionSummary>>,
}

impl InventoryContributionIndex {
    pub fn new(summaries: Vec<InvestorContributionSummary>) -> Self {
        let mut by_plot: HashMap<Uuid, Vec<InvestorContributionSummary>> = HashMap::new();
        for summary in summaries {
            if let Some(plot_id) = summary.plot_id {
                by_plot.entry(plot_id).or_default().push(summary);
            }
        }
        Self { by_plot }
    }

    pub fn for_plot(&self, plot_id: Uuid) -> Vec<InvestorContributionSummary> {
        self.by_plot.get(&plot_id).cloned().unwrap_or_default()
    }

    pub fn total_for_plot(&self, plot_id: Uuid) -> Decimal {
        self.by_plot
            .get(&plot_id)
            .map(|s| s.iter().map(|c| c.total_amount).sum())
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(investor_id: Uuid, amount: i64) -> InvestorContribution {
        InvestorContribution {
            investor_id,
            amount: Decimal::from(amount),
        }
    }

    #[test]
    fn test_merges_repeated_investors() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (merged, total) = normalize_contributions(&[
            contribution(a, 300),
            contribution(b, 200),
            contribution(a, 100),
        ])
        .unwrap();

        assert_eq!(merged, vec![contribution(a, 400), contribution(b, 200)]);
        assert_eq!(total, Decimal::from(600));
    }

    #[test]
    fn test_zero_total_is_rejected() {
        let a = Uuid::new_v4();
        assert_eq!(
            normalize_contributions(&[contribution(a, 0)]),
            Err(LedgerError::EmptyPayment)
        );
        assert_eq!(normalize_contributions(&[]), Err(LedgerError::EmptyPayment));
    }

    #[test]
    fn test_contribution_index_totals_per_plot() {
        let plot = Uuid::new_v4();
        let summary = |amount: i64, plot_id: Option<Uuid>| InvestorContributionSummary {
            investor_id: Some(Uuid::new_v4()),
            investor_name: None,
            plot_id,
            plot_number: None,
            total_amount: Decimal::from(amount),
            payment_count: 1,
        };
        let index = InventoryContributionIndex::new(vec![
            summary(500, Some(plot)),
            summary(250, Some(plot)),
            summary(900, None),
        ]);

        assert_eq!(index.total_for_plot(plot), Decimal::from(750));
        assert_eq!(index.for_plot(plot).len(), 2);
        assert_eq!(index.total_for_plot(Uuid::new_v4()), Decimal::ZERO);
    }

    #[test]
    fn test_huge_amounts_are_rejected_without_overflow() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let huge = |investor_id| InvestorContribution {
            investor_id,
            amount: Decimal::MAX,
        };

        assert_eq!(
            normalize_contributions(&[huge(a), huge(a)]),
            Err(LedgerError::AmountOutOfRange)
        );
        assert_eq!(
            normalize_contributions(&[huge(a), huge(b)]),
            Err(LedgerError::AmountOutOfRange)
        );
    }

    #[test]
    fn test_merged_amount_must_fit_a_payment_row() {
        let a = Uuid::new_v4();
        let full = InvestorContribution {
            investor_id: a,
            amount: MAX_MONEY_AMOUNT,
        };
        let cent = InvestorContribution {
            investor_id: a,
            amount: Decimal::new(1, 2),
        };

        assert!(normalize_contributions(&[full.clone()]).is_ok());
        assert_eq!(
            normalize_contributions(&[full, cent]),
            Err(LedgerError::AmountOutOfRange)
        );
    }

    #[test]
    fn test_totals_across_investors_do_not_overflow() {
        let contributions: Vec<InvestorContribution> = (0..4)
            .map(|_| InvestorContribution {
                investor_id: Uuid::new_v4(),
                amount: MAX_MONEY_AMOUNT,
            })
            .collect();

        let (merged, total) = normalize_contributions(&contributions).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(total, MAX_MONEY_AMOUNT * Decimal::from(4));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let a = Uuid::new_v4();
        assert_eq!(
            normalize_contributions(&[contribution(a, 500), contribution(a, -1)]),
            Err(LedgerError::NegativeAmount)
        );
    }
}
