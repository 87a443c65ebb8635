//! Deal models needed for plot consumption

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::validation::MAX_PERCENTAGE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Uuid,
    pub salesperson_id: Uuid,
    pub inventory_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub property_type: Option<String>,
    pub status: DealStatus,
    pub original_price: Decimal,
    pub sale_price: Decimal,
    pub profit: Decimal,
    pub profit_percentage: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    #[default]
    InProgress,
    DealDone,
    DealNotDone,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::InProgress => "in_progress",
            DealStatus::DealDone => "deal_done",
            DealStatus::DealNotDone => "deal_not_done",
        }
    }
}

impl FromStr for DealStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(DealStatus::InProgress),
            "deal_done" => Ok(DealStatus::DealDone),
            "deal_not_done" => Ok(DealStatus::DealNotDone),
            other => Err(format!("Unknown deal status: {}", other)),
        }
    }
}

/// Profit and profit percentage of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealFinancials {
    pub profit: Decimal,
    pub profit_percentage: Decimal,
}

impl DealFinancials {
    /// Prices are expected to be validated amounts. Fails when the profit
    /// percentage does not fit the deal record.
    pub fn compute(original_price: Decimal, sale_price: Decimal) -> Result<Self, &'static str> {
        const OUT_OF_RANGE: &str = "Profit percentage is out of range";

        let profit = sale_price.checked_sub(original_price).ok_or(OUT_OF_RANGE)?;
        let profit_percentage = if original_price > Decimal::ZERO {
            profit
                .checked_div(original_price)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                .map(|pct| pct.round_dp(2))
                .filter(|pct| pct.abs() <= MAX_PERCENTAGE)
                .ok_or(OUT_OF_RANGE)?
        } else {
            Decimal::ZERO
        };
        Ok(Self {
            profit,
            profit_percentage,
        })
    }
}

/// Junction row binding a plot to a deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealPlot {
    pub deal_id: Uuid,
    pub plot_id: Uuid,
    pub plot_number: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_percentage() {
        let f = DealFinancials::compute(Decimal::from(200_000), Decimal::from(250_000)).unwrap();
        assert_eq!(f.profit, Decimal::from(50_000));
        assert_eq!(f.profit_percentage, Decimal::from(25));
    }

    #[test]
    fn test_zero_original_price() {
        let f = DealFinancials::compute(Decimal::ZERO, Decimal::from(1_000)).unwrap();
        assert_eq!(f.profit_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_percentage_beyond_record_limit_is_rejected() {
        let one_cent = Decimal::new(1, 2);
        let top = crate::validation::MAX_MONEY_AMOUNT;
        assert!(DealFinancials::compute(one_cent, top).is_err());
        assert!(DealFinancials::compute(Decimal::from(1), Decimal::from(1_000_000)).is_ok());
    }
}
