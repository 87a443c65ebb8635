//! Inventory and deal tests
//!
//! Tests for inventory setup and deal consumption including:
//! - Plot number input parsing and placeholder generation
//! - Per-plot contribution totals
//! - Deal profit calculation

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    parse_plot_numbers, placeholder_plot_numbers, resolve_plot_numbers, validate_positive_amount,
    DealFinancials, DealStatus, InventoryCategory, InventoryContributionIndex,
    InvestorContributionSummary, PlotNumberError,
};
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn summary(plot_id: Uuid, amount: &str) -> InvestorContributionSummary {
    InvestorContributionSummary {
        investor_id: Some(Uuid::new_v4()),
        investor_name: Some("Investor".to_string()),
        plot_id: Some(plot_id),
        plot_number: None,
        total_amount: dec(amount),
        payment_count: 1,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Placeholders are unique and match the quantity
    #[test]
    fn prop_placeholders_are_unique(quantity in 1i32..500) {
        let numbers = resolve_plot_numbers(InventoryCategory::House, quantity, None).unwrap();
        let unique: HashSet<&String> = numbers.iter().collect();
        prop_assert_eq!(numbers.len(), quantity as usize);
        prop_assert_eq!(unique.len(), numbers.len());
    }

    /// Parsing ignores separators and blank entries
    #[test]
    fn prop_parse_keeps_every_token(tokens in prop::collection::vec("[A-Z0-9]{1,5}", 1..20)) {
        let input = tokens.join(" ,\n");
        prop_assert_eq!(parse_plot_numbers(&input), tokens);
    }

    /// Profit percentage follows the sign of the profit
    #[test]
    fn prop_profit_sign_follows_sale(original in 1i64..10_000_000, sale in 0i64..20_000_000) {
        let f = DealFinancials::compute(Decimal::new(original, 2), Decimal::new(sale, 2)).unwrap();
        prop_assert_eq!(f.profit, Decimal::new(sale - original, 2));
        if sale < original {
            prop_assert!(f.profit_percentage <= Decimal::ZERO);
        } else {
            prop_assert!(f.profit_percentage >= Decimal::ZERO);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_parse_mixed_separators() {
        assert_eq!(
            parse_plot_numbers("A-1, A-2;A-3\nA-4,,"),
            vec!["A-1", "A-2", "A-3", "A-4"]
        );
        assert!(parse_plot_numbers(" , ;\n").is_empty());
    }

    #[test]
    fn test_placeholder_format() {
        assert_eq!(
            placeholder_plot_numbers(InventoryCategory::ShopOffice, 2),
            vec!["shop_office-1", "shop_office-2"]
        );
    }

    #[test]
    fn test_count_must_match_quantity() {
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 3, Some("1,2")),
            Err(PlotNumberError::CountMismatch { given: 2, quantity: 3 })
        );
    }

    #[test]
    fn test_duplicates_reported_once() {
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 4, Some("7,7,8,7")),
            Err(PlotNumberError::Duplicates("7".to_string()))
        );
    }

    #[test]
    fn test_blank_input_falls_back_to_placeholders() {
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 2, Some("  ")),
            Ok(vec!["plot-1".to_string(), "plot-2".to_string()])
        );
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 0, None),
            Err(PlotNumberError::InvalidQuantity)
        );
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(InventoryCategory::ShopOffice.as_str(), "shop_office");
        assert_eq!(
            "house".parse::<InventoryCategory>(),
            Ok(InventoryCategory::House)
        );
        assert!("villa".parse::<InventoryCategory>().is_err());
    }

    #[test]
    fn test_contribution_totals_per_plot() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let index = InventoryContributionIndex::new(vec![
            summary(p1, "500"),
            summary(p1, "250.50"),
            summary(p2, "100"),
        ]);

        assert_eq!(index.for_plot(p1).len(), 2);
        assert_eq!(index.total_for_plot(p1), dec("750.50"));
        assert_eq!(index.total_for_plot(p2), dec("100"));
        assert_eq!(index.total_for_plot(Uuid::new_v4()), Decimal::ZERO);
    }

    #[test]
    fn test_deal_financials() {
        let f = DealFinancials::compute(dec("100000"), dec("125000")).unwrap();
        assert_eq!(f.profit, dec("25000"));
        assert_eq!(f.profit_percentage, dec("25"));

        let thirds = DealFinancials::compute(dec("3"), dec("4")).unwrap();
        assert_eq!(thirds.profit_percentage, dec("33.33"));

        let free = DealFinancials::compute(Decimal::ZERO, dec("10")).unwrap();
        assert_eq!(free.profit_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_deal_status_default() {
        assert_eq!(DealStatus::default(), DealStatus::InProgress);
        assert_eq!(DealStatus::DealNotDone.as_str(), "deal_not_done");
    }

    #[test]
    fn test_amount_precision() {
        assert!(validate_positive_amount(dec("10.25")).is_ok());
        assert!(validate_positive_amount(dec("10.255")).is_err());
        assert!(validate_positive_amount(Decimal::ZERO).is_err());
    }
}
