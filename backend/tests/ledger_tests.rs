//! Investor funding ledger tests
//!
//! Tests for the payment ledger including:
//! - Remaining balance always equals commitment minus recorded payments
//! - Over-draws are rejected before anything is recorded
//! - Multi-investor payments promote a covered plot

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    normalize_contributions, InvestorBalance, InvestorContribution, LedgerError, LedgerPosition,
    PlotStatus, SalespersonBalance,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory ledger for one investor, mirroring how balances are rebuilt
/// from the payment rows after every mutation
struct Ledger {
    total_invested: Decimal,
    payments: Vec<(Uuid, Decimal)>,
}

impl Ledger {
    fn new(total_invested: Decimal) -> Self {
        Self {
            total_invested,
            payments: Vec::new(),
        }
    }

    fn position(&self) -> LedgerPosition {
        let used = self.payments.iter().map(|(_, a)| *a).sum();
        LedgerPosition::new(self.total_invested, used)
    }

    fn record(&mut self, amount: Decimal) -> Result<Uuid, LedgerError> {
        self.position().ensure_can_cover("Test Investor", amount)?;
        let id = Uuid::new_v4();
        self.payments.push((id, amount));
        Ok(id)
    }

    fn update(&mut self, id: Uuid, amount: Decimal) -> Result<(), LedgerError> {
        let old = self
            .payments
            .iter()
            .find(|(p, _)| *p == id)
            .map(|(_, a)| *a)
            .unwrap_or(Decimal::ZERO);
        self.position()
            .with_replaced_payment(old, Decimal::ZERO)
            .ensure_can_cover("Test Investor", amount)?;
        for payment in self.payments.iter_mut().filter(|(p, _)| *p == id) {
            payment.1 = amount;
        }
        Ok(())
    }

    fn delete(&mut self, id: Uuid) {
        self.payments.retain(|(p, _)| *p != id);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// remaining = total_invested - sum(payments) after any sequence of draws
    #[test]
    fn prop_remaining_matches_ledger(
        invested_cents in 0i64..10_000_000,
        draws in prop::collection::vec(1i64..2_000_000, 0..30),
    ) {
        let mut ledger = Ledger::new(Decimal::new(invested_cents, 2));
        for cents in draws {
            let _ = ledger.record(Decimal::new(cents, 2));
        }

        let position = ledger.position();
        let recorded: Decimal = ledger.payments.iter().map(|(_, a)| *a).sum();
        prop_assert_eq!(position.remaining(), ledger.total_invested - recorded);
        prop_assert!(position.remaining() >= Decimal::ZERO);
    }

    /// A rejected draw leaves the ledger untouched
    #[test]
    fn prop_rejected_draw_changes_nothing(
        invested_cents in 0i64..1_000_000,
        excess_cents in 1i64..1_000_000,
    ) {
        let mut ledger = Ledger::new(Decimal::new(invested_cents, 2));
        let before = ledger.position();
        let result = ledger.record(Decimal::new(invested_cents + excess_cents, 2));
        prop_assert!(result.is_err());
        prop_assert_eq!(ledger.position(), before);
        prop_assert!(ledger.payments.is_empty());
    }

    /// Recording then deleting a payment restores the balance
    #[test]
    fn prop_delete_restores_balance(
        invested_cents in 1i64..10_000_000,
        fraction in 1i64..=100,
    ) {
        let invested = Decimal::new(invested_cents, 2);
        let amount = (invested * Decimal::new(fraction, 2)).round_dp(2);
        prop_assume!(amount > Decimal::ZERO);

        let mut ledger = Ledger::new(invested);
        let id = ledger.record(amount).unwrap();
        prop_assert_eq!(ledger.position().remaining(), invested - amount);
        ledger.delete(id);
        prop_assert_eq!(ledger.position().remaining(), invested);
    }

    /// The salesperson aggregate is the sum of its investors
    #[test]
    fn prop_salesperson_balance_sums_investors(
        positions in prop::collection::vec((0i64..1_000_000, 0i64..1_000_000), 0..10)
    ) {
        let positions: Vec<LedgerPosition> = positions
            .into_iter()
            .map(|(a, b)| LedgerPosition::new(Decimal::new(a.max(b), 2), Decimal::new(a.min(b), 2)))
            .collect();
        let balance = SalespersonBalance::from_positions(&positions);
        let remaining: Decimal = positions.iter().map(|p| p.remaining()).sum();
        prop_assert_eq!(balance.remaining_balance, remaining);
        prop_assert_eq!(balance.total_invested - balance.total_used, remaining);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// $6,000 against a $5,000 commitment is refused with the exact message
    #[test]
    fn test_overdraw_rejected() {
        let mut ledger = Ledger::new(dec("5000"));
        let err = ledger.record(dec("6000")).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Investor Test Investor has insufficient balance. Available: $5000.00, Requested: $6000.00"
        );
        assert!(ledger.payments.is_empty());
        assert_eq!(ledger.position().remaining(), dec("5000"));
    }

    #[test]
    fn test_record_and_delete_round_trip() {
        let mut ledger = Ledger::new(dec("5000"));
        let id = ledger.record(dec("3000")).unwrap();
        assert_eq!(ledger.position().remaining(), dec("2000"));

        ledger.delete(id);
        assert_eq!(ledger.position().remaining(), dec("5000"));
    }

    /// Two investors covering the price in one call promote the plot
    #[test]
    fn test_split_payment_promotes_plot() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let contributions = vec![
            InvestorContribution { investor_id: a, amount: dec("500") },
            InvestorContribution { investor_id: b, amount: dec("500") },
        ];

        let (merged, total) = normalize_contributions(&contributions).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(total, dec("1000"));

        let status = PlotStatus::Assigned.after_payment(total, dec("1000"));
        assert_eq!(status, PlotStatus::Paid);

        // Later payments against a paid plot are still accepted and leave it paid
        assert_eq!(status.after_payment(total + dec("1"), dec("1000")), PlotStatus::Paid);
    }

    #[test]
    fn test_one_cent_short_stays_assigned() {
        assert_eq!(
            PlotStatus::Assigned.after_payment(dec("999.99"), dec("1000")),
            PlotStatus::Assigned
        );
        assert_eq!(
            PlotStatus::Assigned.after_payment(dec("1000.00"), dec("1000")),
            PlotStatus::Paid
        );
    }

    #[test]
    fn test_duplicate_investors_are_merged() {
        let a = Uuid::new_v4();
        let contributions = vec![
            InvestorContribution { investor_id: a, amount: dec("300") },
            InvestorContribution { investor_id: a, amount: dec("200") },
            InvestorContribution { investor_id: Uuid::new_v4(), amount: Decimal::ZERO },
        ];

        let (merged, total) = normalize_contributions(&contributions).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].amount, dec("500"));
        assert_eq!(total, dec("500"));
    }

    #[test]
    fn test_empty_and_negative_payments_rejected() {
        let zero = vec![InvestorContribution { investor_id: Uuid::new_v4(), amount: Decimal::ZERO }];
        assert_eq!(normalize_contributions(&zero), Err(LedgerError::EmptyPayment));
        assert_eq!(normalize_contributions(&[]), Err(LedgerError::EmptyPayment));

        let negative = vec![InvestorContribution { investor_id: Uuid::new_v4(), amount: dec("-1") }];
        assert_eq!(normalize_contributions(&negative), Err(LedgerError::NegativeAmount));
    }

    /// Editing a payment checks the new amount against the balance without the old one
    #[test]
    fn test_update_excludes_old_amount() {
        let mut ledger = Ledger::new(dec("5000"));
        let id = ledger.record(dec("4000")).unwrap();

        assert!(ledger.update(id, dec("5000")).is_ok());
        assert_eq!(ledger.position().remaining(), Decimal::ZERO);
        assert!(ledger.update(id, dec("5000.01")).is_err());
    }

    #[test]
    fn test_commitment_cannot_drop_below_used() {
        let position = LedgerPosition::new(dec("5000"), dec("3000"));
        assert!(position.ensure_commitment("Test Investor", dec("3000")).is_ok());
        assert!(matches!(
            position.ensure_commitment("Test Investor", dec("2999.99")),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(
            position.ensure_commitment("Test Investor", dec("-1")),
            Err(LedgerError::NegativeCommitment)
        );
    }

    #[test]
    fn test_investor_balance_projection() {
        let id = Uuid::new_v4();
        let balance = InvestorBalance::new(
            id,
            "Khun Somchai".to_string(),
            LedgerPosition::new(dec("10000"), dec("2500")),
        );
        assert_eq!(balance.investor_id, id);
        assert_eq!(balance.used_balance, dec("2500"));
        assert_eq!(balance.remaining_balance, dec("7500"));
    }
}
