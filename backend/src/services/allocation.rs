//! Plot allocation engine
//!
//! Assigns available plots of an inventory unit to a salesperson and keeps
//! the unit's aggregate status in step with its plots.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    validate_non_negative_amount, AssignmentSummary, InventoryStatus, Plot, PlotAssignment,
    PlotStatus, MAX_MONEY_AMOUNT,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::plots::{
    lock_inventory, lock_unit_plots, plot_numbers, refresh_inventory_status, user_exists,
};
use crate::error::{AppError, AppResult};

/// Plot allocation service
#[derive(Clone)]
pub struct AllocationService {
    db: PgPool,
}

/// Input for assigning plots
#[derive(Debug, Deserialize, Validate)]
pub struct AssignPlotsInput {
    pub salesperson_id: Uuid,
    #[validate(length(min = 1, message = "Please select at least one plot"))]
    pub plot_ids: Vec<Uuid>,
    pub amount_paid: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Outcome of an assignment
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentResult {
    pub assignment: PlotAssignment,
    #[serde(flatten)]
    pub summary: AssignmentSummary,
    pub inventory_status: InventoryStatus,
}

/// Database row for assignment record
#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    id: Uuid,
    inventory_id: Uuid,
    salesperson_id: Uuid,
    assignment_date: NaiveDate,
    total_plots_assigned: i32,
    total_amount: Decimal,
    amount_paid: Decimal,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AssignmentRow> for PlotAssignment {
    fn from(row: AssignmentRow) -> Self {
        PlotAssignment {
            id: row.id,
            inventory_id: row.inventory_id,
            salesperson_id: row.salesperson_id,
            assignment_date: row.assignment_date,
            total_plots_assigned: row.total_plots_assigned,
            total_amount: row.total_amount,
            amount_paid: row.amount_paid,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

impl AllocationService {
    /// Create a new AllocationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Assign plots of a unit to a salesperson (admin operation)
    pub async fn assign_plots(
        &self,
        inventory_id: Uuid,
        input: AssignPlotsInput,
    ) -> AppResult<AssignmentResult> {
        input.validate()?;

        let amount_paid = input.amount_paid.unwrap_or(Decimal::ZERO);
        validate_non_negative_amount(amount_paid)
            .map_err(|msg| AppError::validation("amount_paid", msg))?;

        let mut tx = self.db.begin().await?;

        if !user_exists(&mut *tx, input.salesperson_id).await? {
            return Err(AppError::NotFound("Salesperson".to_string()));
        }

        let result = assign_locked(
            &mut *tx,
            inventory_id,
            &input.plot_ids,
            input.salesperson_id,
            amount_paid,
            input.notes.as_deref(),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            inventory_id = %inventory_id,
            salesperson_id = %input.salesperson_id,
            plots = result.summary.plots_assigned,
            "Plots assigned"
        );

        Ok(result)
    }

    /// Assignment history of a unit, newest first
    pub async fn list_assignments(&self, inventory_id: Uuid) -> AppResult<Vec<PlotAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, inventory_id, salesperson_id, assignment_date, total_plots_assigned,
                   total_amount, amount_paid, notes, created_at
            FROM inventory_plot_assignments
            WHERE inventory_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(inventory_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Assign plots inside an open transaction.
///
/// Locks the unit and the plots, then re-checks that every plot is still
/// available before writing anything. Shared with request approval.
pub(crate) async fn assign_locked(
    conn: &mut PgConnection,
    inventory_id: Uuid,
    plot_ids: &[Uuid],
    salesperson_id: Uuid,
    amount_paid: Decimal,
    notes: Option<&str>,
) -> AppResult<AssignmentResult> {
    if plot_ids.is_empty() {
        return Err(AppError::validation("plot_ids", "Please select at least one plot"));
    }

    let unit = lock_inventory(&mut *conn, inventory_id).await?;
    let plots = lock_unit_plots(&mut *conn, inventory_id, plot_ids).await?;

    let unavailable: Vec<&Plot> = plots.iter().filter(|p| !p.status.is_allocatable()).collect();
    if !unavailable.is_empty() {
        tracing::warn!(
            inventory_id = %inventory_id,
            plots = %plot_numbers(&unavailable),
            "Assignment rejected, plots no longer available"
        );
        return Err(AppError::conflict(
            "plot_ids",
            format!("Some plots are not available: {}", plot_numbers(&unavailable)),
        ));
    }

    let summary = AssignmentSummary::new(plots.len(), unit.price, amount_paid);
    if summary.total_amount > MAX_MONEY_AMOUNT {
        return Err(AppError::validation(
            "plot_ids",
            "Total amount of the assignment cannot exceed 9999999999999.99",
        ));
    }

    let row = sqlx::query_as::<_, AssignmentRow>(
        r#"
        INSERT INTO inventory_plot_assignments (
            inventory_id, salesperson_id, assignment_date, total_plots_assigned,
            total_amount, amount_paid, notes
        )
        VALUES ($1, $2, CURRENT_DATE, $3, $4, $5, $6)
        RETURNING id, inventory_id, salesperson_id, assignment_date, total_plots_assigned,
                  total_amount, amount_paid, notes, created_at
        "#,
    )
    .bind(inventory_id)
    .bind(salesperson_id)
    .bind(summary.plots_assigned)
    .bind(summary.total_amount)
    .bind(summary.amount_paid)
    .bind(notes)
    .fetch_one(&mut *conn)
    .await?;

    for plot in &plots {
        let status = plot.status.transition(PlotStatus::Assigned)?;
        sqlx::query(
            r#"
            UPDATE inventory_plots
            SET status = $1, assigned_to = $2, assigned_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(salesperson_id)
        .bind(plot.id)
        .execute(&mut *conn)
        .await?;
    }

    let inventory_status = refresh_inventory_status(&mut *conn, inventory_id).await?;

    Ok(AssignmentResult {
        assignment: row.into(),
        summary,
        inventory_status,
    })
}
