//! Inventory unit models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::PlotStatus;

/// A purchasable parcel subdivided into plots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub id: Uuid,
    pub category: InventoryCategory,
    pub address: String,
    /// Price of a single plot
    pub price: Decimal,
    /// Number of plots
    pub quantity: i32,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InventoryCategory {
    Plot,
    House,
    ShopOffice,
}

impl InventoryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryCategory::Plot => "plot",
            InventoryCategory::House => "house",
            InventoryCategory::ShopOffice => "shop_office",
        }
    }
}

impl FromStr for InventoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plot" => Ok(InventoryCategory::Plot),
            "house" => Ok(InventoryCategory::House),
            "shop_office" => Ok(InventoryCategory::ShopOffice),
            other => Err(format!("Unknown inventory category: {}", other)),
        }
    }
}

impl std::fmt::Display for InventoryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse unit status, always derived from the unit's plots
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    Available,
    Assigned,
    Paid,
    Sold,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Available => "available",
            InventoryStatus::Assigned => "assigned",
            InventoryStatus::Paid => "paid",
            InventoryStatus::Sold => "sold",
        }
    }

    /// Aggregate a unit status from the statuses of its plots.
    ///
    /// A unit stays `available` while any plot is still free. Once none is,
    /// it is `sold` when every plot is consumed, `paid` when every plot is at
    /// least paid, and `assigned` otherwise.
    pub fn derive(plots: &[PlotStatus]) -> InventoryStatus {
        if plots.is_empty() || plots.iter().any(|s| s.is_allocatable()) {
            return InventoryStatus::Available;
        }
        if plots.iter().all(|s| s.is_terminal()) {
            return InventoryStatus::Sold;
        }
        if plots.iter().all(|s| s.rank() >= PlotStatus::Paid.rank()) {
            return InventoryStatus::Paid;
        }
        InventoryStatus::Assigned
    }
}

impl FromStr for InventoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(InventoryStatus::Available),
            "assigned" => Ok(InventoryStatus::Assigned),
            "paid" => Ok(InventoryStatus::Paid),
            "sold" => Ok(InventoryStatus::Sold),
            other => Err(format!("Unknown inventory status: {}", other)),
        }
    }
}

impl std::fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
