//! One-time migration of whole-unit inventory records to the plot model
//!
//! Units stored before plots existed carry their assignment on the unit row
//! itself. Each such unit gets `quantity` placeholder plots that inherit the
//! unit's status and assignee, after which every code path works per plot.

use rust_decimal::Decimal;
use shared::{placeholder_plot_numbers, InventoryCategory, InventoryStatus, PlotStatus};
use sqlx::PgPool;
use uuid::Uuid;

use super::plots::refresh_inventory_status;
use crate::error::{AppError, AppResult};

/// Legacy inventory migration
#[derive(Clone)]
pub struct LegacyPlotMigration {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct LegacyUnitRow {
    id: Uuid,
    category: String,
    price: Decimal,
    quantity: i32,
    status: String,
    assigned_to: Option<Uuid>,
}

impl LegacyPlotMigration {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Synthesize plots for every unit that has none. Returns the number of units migrated.
    pub async fn run(&self) -> AppResult<usize> {
        let units = sqlx::query_as::<_, LegacyUnitRow>(
            r#"
            SELECT i.id, i.category, i.price, i.quantity, i.status, i.assigned_to
            FROM inventory i
            WHERE NOT EXISTS(SELECT 1 FROM inventory_plots p WHERE p.inventory_id = i.id)
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        for unit in &units {
            self.migrate_unit(unit).await?;
        }

        if !units.is_empty() {
            tracing::info!(units = units.len(), "Synthesized placeholder plots for legacy inventory");
        }

        Ok(units.len())
    }

    async fn migrate_unit(&self, unit: &LegacyUnitRow) -> AppResult<()> {
        let category: InventoryCategory = unit
            .category
            .parse()
            .map_err(|e| AppError::corrupt("inventory category", e))?;
        let numbers = placeholder_plot_numbers(category, unit.quantity);
        let unit_status: InventoryStatus = unit
            .status
            .parse()
            .map_err(|e| AppError::corrupt("inventory status", e))?;
        let status = PlotStatus::for_legacy_unit(unit_status, unit.assigned_to.is_some());
        let assignee = if status == PlotStatus::Available {
            None
        } else {
            unit.assigned_to
        };

        let mut tx = self.db.begin().await?;

        sqlx::query("SELECT id FROM inventory WHERE id = $1 FOR UPDATE")
            .bind(unit.id)
            .execute(&mut *tx)
            .await?;

        // Skip if another instance migrated this unit first
        let already = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM inventory_plots WHERE inventory_id = $1)",
        )
        .bind(unit.id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Ok(());
        }

        let plot_ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_plots (inventory_id, plot_number, status, assigned_to, assigned_at)
            SELECT $1, n, $3, $4, CASE WHEN $4::uuid IS NULL THEN NULL ELSE NOW() END
            FROM UNNEST($2::text[]) AS n
            RETURNING id
            "#,
        )
        .bind(unit.id)
        .bind(&numbers)
        .bind(status.as_str())
        .bind(assignee)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(salesperson_id) = assignee {
            sqlx::query(
                r#"
                INSERT INTO inventory_plot_assignments (
                    inventory_id, salesperson_id, total_plots_assigned, total_amount, amount_paid, notes
                )
                VALUES ($1, $2, $3, $4, 0, 'Migrated from whole-unit assignment')
                "#,
            )
            .bind(unit.id)
            .bind(salesperson_id)
            .bind(unit.quantity)
            .bind(unit.price * Decimal::from(unit.quantity))
            .execute(&mut *tx)
            .await?;
        }

        // A single-plot unit's whole-unit payments belong to that plot
        if let [plot_id] = plot_ids.as_slice() {
            sqlx::query(
                "UPDATE inventory_payments SET plot_id = $1 WHERE inventory_id = $2 AND plot_id IS NULL",
            )
            .bind(plot_id)
            .bind(unit.id)
            .execute(&mut *tx)
            .await?;
        }

        refresh_inventory_status(&mut *tx, unit.id).await?;

        tx.commit().await?;

        tracing::debug!(inventory_id = %unit.id, plots = plot_ids.len(), "Legacy unit migrated");

        Ok(())
    }
}
