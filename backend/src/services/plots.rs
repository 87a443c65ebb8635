//! Row access shared by every service that mutates plots
//!
//! Lock order inside a transaction is always: inventory unit, then the
//! payment row being corrected, then plots by id, then investors by id.
//! Preconditions are checked only after the rows they depend on are locked.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{InventoryCategory, InventoryStatus, InventoryUnit, Plot, PlotStatus};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub(crate) const PLOT_COLUMNS: &str =
    "id, inventory_id, plot_number, status, assigned_to, assigned_at, created_at";

pub(crate) const INVENTORY_COLUMNS: &str =
    "id, category, address, price, quantity, status, created_at, updated_at";

/// Database row for a plot
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PlotRow {
    id: Uuid,
    inventory_id: Uuid,
    plot_number: String,
    status: String,
    assigned_to: Option<Uuid>,
    assigned_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PlotRow> for Plot {
    type Error = AppError;

    fn try_from(row: PlotRow) -> Result<Self, Self::Error> {
        Ok(Plot {
            id: row.id,
            inventory_id: row.inventory_id,
            plot_number: row.plot_number,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::corrupt("plot status", e))?,
            assigned_to: row.assigned_to,
            assigned_at: row.assigned_at,
            created_at: row.created_at,
        })
    }
}

/// Database row for an inventory unit
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct InventoryRow {
    id: Uuid,
    category: String,
    address: String,
    price: Decimal,
    quantity: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InventoryRow> for InventoryUnit {
    type Error = AppError;

    fn try_from(row: InventoryRow) -> Result<Self, Self::Error> {
        Ok(InventoryUnit {
            id: row.id,
            category: row
                .category
                .parse::<InventoryCategory>()
                .map_err(|e| AppError::corrupt("inventory category", e))?,
            address: row.address,
            price: row.price,
            quantity: row.quantity,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::corrupt("inventory status", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) fn into_plots(rows: Vec<PlotRow>) -> AppResult<Vec<Plot>> {
    rows.into_iter().map(Plot::try_from).collect()
}

/// Sorted, de-duplicated copy of caller-supplied ids
pub(crate) fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}

/// Comma-separated plot numbers for error messages
pub(crate) fn plot_numbers(plots: &[&Plot]) -> String {
    plots
        .iter()
        .map(|p| p.plot_number.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and lock an inventory unit
pub(crate) async fn lock_inventory(
    conn: &mut PgConnection,
    inventory_id: Uuid,
) -> AppResult<InventoryUnit> {
    let row = sqlx::query_as::<_, InventoryRow>(&format!(
        "SELECT {} FROM inventory WHERE id = $1 FOR UPDATE",
        INVENTORY_COLUMNS
    ))
    .bind(inventory_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;

    row.try_into()
}

/// Load and lock a set of plots of one unit.
///
/// Fails with a validation error when any id is unknown or belongs to a
/// different unit.
pub(crate) async fn lock_unit_plots(
    conn: &mut PgConnection,
    inventory_id: Uuid,
    plot_ids: &[Uuid],
) -> AppResult<Vec<Plot>> {
    let ids = unique_ids(plot_ids);
    let rows = sqlx::query_as::<_, PlotRow>(&format!(
        "SELECT {} FROM inventory_plots WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        PLOT_COLUMNS
    ))
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let plots = into_plots(rows)?;
    if plots.len() != ids.len() || plots.iter().any(|p| p.inventory_id != inventory_id) {
        return Err(AppError::validation(
            "plot_ids",
            "Some plots do not belong to this inventory",
        ));
    }
    Ok(plots)
}

/// Lock every plot of a unit currently in `available` state
pub(crate) async fn lock_available_plots(
    conn: &mut PgConnection,
    inventory_id: Uuid,
) -> AppResult<Vec<Plot>> {
    let rows = sqlx::query_as::<_, PlotRow>(&format!(
        "SELECT {} FROM inventory_plots WHERE inventory_id = $1 AND status = $2 ORDER BY id FOR UPDATE",
        PLOT_COLUMNS
    ))
    .bind(inventory_id)
    .bind(PlotStatus::Available.as_str())
    .fetch_all(&mut *conn)
    .await?;

    into_plots(rows)
}

/// Move a plot to `to`, rejecting illegal lifecycle edges
pub(crate) async fn set_plot_status(
    conn: &mut PgConnection,
    plot: &Plot,
    to: PlotStatus,
) -> AppResult<()> {
    let status = plot.status.transition(to)?;
    sqlx::query("UPDATE inventory_plots SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(plot.id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Recompute a unit's status from its plots and persist it
pub(crate) async fn refresh_inventory_status(
    conn: &mut PgConnection,
    inventory_id: Uuid,
) -> AppResult<InventoryStatus> {
    let statuses = sqlx::query_scalar::<_, String>(
        "SELECT status FROM inventory_plots WHERE inventory_id = $1",
    )
    .bind(inventory_id)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(|s| s.parse::<PlotStatus>())
    .collect::<Result<Vec<_>, _>>()
    .map_err(|e| AppError::corrupt("plot status", e))?;

    let status = InventoryStatus::derive(&statuses);

    sqlx::query("UPDATE inventory SET status = $1 WHERE id = $2 AND status <> $1")
        .bind(status.as_str())
        .bind(inventory_id)
        .execute(&mut *conn)
        .await?;

    Ok(status)
}

/// Whether a user row exists
pub(crate) async fn user_exists(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}
