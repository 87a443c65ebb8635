//! Validation utilities for the Realty CRM

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::error::PlotNumberError;
use crate::models::InventoryCategory;

/// Longest plot number the `inventory_plots.plot_number` column holds
pub const MAX_PLOT_NUMBER_LEN: usize = 100;

/// Largest amount a `NUMERIC(15, 2)` column holds: 9999999999999.99
pub const MAX_MONEY_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, 2);

/// Largest percentage a `NUMERIC(12, 2)` column holds: 9999999999.99
pub const MAX_PERCENTAGE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

// ============================================================================
// Plot Numbers
// ============================================================================

/// Split free-form plot number input on commas, semicolons and newlines
pub fn parse_plot_numbers(input: &str) -> Vec<String> {
    input
        .split(|c| c == ',' || c == ';' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Placeholder plot numbers `{category}-1 .. {category}-{quantity}`
pub fn placeholder_plot_numbers(category: InventoryCategory, quantity: i32) -> Vec<String> {
    (1..=quantity)
        .map(|i| format!("{}-{}", category.as_str(), i))
        .collect()
}

/// Resolve the plot numbers for a new inventory unit.
///
/// Explicit input must produce exactly `quantity` distinct numbers; without
/// input, placeholders are generated.
pub fn resolve_plot_numbers(
    category: InventoryCategory,
    quantity: i32,
    input: Option<&str>,
) -> Result<Vec<String>, PlotNumberError> {
    if quantity < 1 {
        return Err(PlotNumberError::InvalidQuantity);
    }

    let numbers = match input.map(parse_plot_numbers) {
        Some(numbers) if !numbers.is_empty() => numbers,
        _ => return Ok(placeholder_plot_numbers(category, quantity)),
    };

    if numbers.len() != quantity as usize {
        return Err(PlotNumberError::CountMismatch {
            given: numbers.len(),
            quantity,
        });
    }

    if let Some(long) = numbers.iter().find(|n| n.chars().count() > MAX_PLOT_NUMBER_LEN) {
        return Err(PlotNumberError::TooLong(long.clone()));
    }

    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for n in &numbers {
        if !seen.insert(n.as_str()) && !duplicates.contains(&n.as_str()) {
            duplicates.push(n);
        }
    }
    if !duplicates.is_empty() {
        return Err(PlotNumberError::Duplicates(duplicates.join(", ")));
    }

    Ok(numbers)
}

// ============================================================================
// Money
// ============================================================================

/// Validate a price or amount that must be strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than 0");
    }
    validate_money_precision(amount)
}

/// Validate an amount that may be zero (e.g. initial payment at assignment)
pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    validate_money_precision(amount)
}

/// Trailing zeros are fine: `1000.000` is a valid amount
fn validate_money_precision(amount: Decimal) -> Result<(), &'static str> {
    if amount.normalize().scale() > 2 {
        return Err("Amount cannot have more than 2 decimal places");
    }
    if amount > MAX_MONEY_AMOUNT {
        return Err("Amount cannot exceed 9999999999999.99");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_separators() {
        assert_eq!(
            parse_plot_numbers("A-1, A-2;A-3\n A-4 ,,"),
            vec!["A-1", "A-2", "A-3", "A-4"]
        );
    }

    #[test]
    fn test_placeholders_when_input_blank() {
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::House, 2, Some("  ")),
            Ok(vec!["house-1".to_string(), "house-2".to_string()])
        );
    }

    #[test]
    fn test_count_must_match_quantity() {
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 3, Some("1,2")),
            Err(PlotNumberError::CountMismatch {
                given: 2,
                quantity: 3
            })
        );
    }

    #[test]
    fn test_duplicates_are_listed_once() {
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 4, Some("1,2,1,1")),
            Err(PlotNumberError::Duplicates("1".to_string()))
        );
    }

    #[test]
    fn test_amount_validation() {
        assert!(validate_positive_amount(Decimal::new(1, 2)).is_ok());
        assert!(validate_positive_amount(Decimal::ZERO).is_err());
        assert!(validate_positive_amount(Decimal::new(1, 3)).is_err());
        assert!(validate_non_negative_amount(Decimal::ZERO).is_ok());
    }

    #[test]
    fn test_trailing_zeros_are_accepted() {
        let amount: Decimal = "1000.000".parse().unwrap();
        assert_eq!(amount.scale(), 3);
        assert!(validate_positive_amount(amount).is_ok());
        assert!(validate_non_negative_amount(amount).is_ok());
        assert!(validate_positive_amount("1000.001".parse().unwrap()).is_err());
    }

    #[test]
    fn test_amount_column_limits() {
        assert_eq!(MAX_MONEY_AMOUNT.to_string(), "9999999999999.99");
        assert_eq!(MAX_PERCENTAGE.to_string(), "9999999999.99");
        assert!(validate_positive_amount(MAX_MONEY_AMOUNT).is_ok());
        assert!(validate_positive_amount(Decimal::from(10_000_000_000_000_i64)).is_err());
        assert!(validate_non_negative_amount(Decimal::MAX).is_err());
    }

    #[test]
    fn test_plot_number_length_limit() {
        let long = "x".repeat(MAX_PLOT_NUMBER_LEN + 1);
        let input = format!("A-1,{}", long);
        assert_eq!(
            resolve_plot_numbers(InventoryCategory::Plot, 2, Some(&input)),
            Err(PlotNumberError::TooLong(long))
        );

        let fits = "y".repeat(MAX_PLOT_NUMBER_LEN);
        assert!(resolve_plot_numbers(InventoryCategory::Plot, 1, Some(&fits)).is_ok());
    }
}
