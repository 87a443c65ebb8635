//! WebAssembly module for the Realty CRM
//!
//! Provides client-side checks for:
//! - Plot number entry on new inventory
//! - Unit status preview from plot statuses
//! - Investor balance coverage before submitting a payment
//! - Deal profit figures

use rust_decimal::Decimal;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str(concat!(
        "realty-crm-wasm ",
        env!("CARGO_PKG_VERSION")
    )));
}

fn parse_amount(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim()).ok()
}

/// Resolve the plot numbers a new unit would get, as a JSON array
#[wasm_bindgen]
pub fn preview_plot_numbers(
    category: &str,
    quantity: i32,
    input: Option<String>,
) -> Result<String, JsValue> {
    let category = InventoryCategory::from_str(category).map_err(|e| JsValue::from_str(&e))?;
    let numbers = resolve_plot_numbers(category, quantity, input.as_deref())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_json::to_string(&numbers).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Unit status implied by a JSON array of plot statuses
#[wasm_bindgen]
pub fn derive_unit_status(statuses_json: &str) -> Result<String, JsValue> {
    let statuses: Vec<PlotStatus> = serde_json::from_str(statuses_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid statuses JSON: {}", e)))?;
    Ok(InventoryStatus::derive(&statuses).to_string())
}

/// Remaining balance of an investor, or `None` for malformed amounts
#[wasm_bindgen]
pub fn investor_remaining_balance(total_invested: &str, used: &str) -> Option<String> {
    let position = LedgerPosition::new(parse_amount(total_invested)?, parse_amount(used)?);
    Some(format!("{:.2}", position.remaining()))
}

/// Error message if the investor cannot cover `amount`, `None` if they can
#[wasm_bindgen]
pub fn check_investor_coverage(
    investor_name: &str,
    total_invested: &str,
    used: &str,
    amount: &str,
) -> Option<String> {
    let (Some(total), Some(used), Some(amount)) = (
        parse_amount(total_invested),
        parse_amount(used),
        parse_amount(amount),
    ) else {
        return Some("Invalid amount".to_string());
    };
    if let Err(msg) = validate_positive_amount(amount) {
        return Some(msg.to_string());
    }
    LedgerPosition::new(total, used)
        .ensure_can_cover(investor_name, amount)
        .err()
        .map(|e| e.to_string())
}

/// Profit percentage of a deal, rounded to two places; `NaN` when out of range
#[wasm_bindgen]
pub fn calculate_profit_percentage(original_price: f64, sale_price: f64) -> f64 {
    let original = Decimal::try_from(original_price).unwrap_or(Decimal::ZERO);
    let sale = Decimal::try_from(sale_price).unwrap_or(Decimal::ZERO);
    match DealFinancials::compute(original, sale) {
        Ok(f) => f.profit_percentage.to_string().parse().unwrap_or(f64::NAN),
        Err(_) => f64::NAN,
    }
}

/// Whether a plot in `status` can be attached to a deal
#[wasm_bindgen]
pub fn is_plot_consumable(status: &str) -> bool {
    PlotStatus::from_str(status)
        .map(|s| s.is_consumable())
        .unwrap_or(false)
}
