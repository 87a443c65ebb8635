//! Inventory unit management and role-scoped inventory reads

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    partition_by_assignee, resolve_plot_numbers, sort_plots, validate_positive_amount, AccessScope,
    InventoryCategory, InventoryContributionIndex, InventoryStatus, InventoryUnit,
    InvestorContributionSummary, Plot, PlotStatus,
};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::payments::contributions_for_units;
use super::plots::{
    into_plots, lock_inventory, InventoryRow, PlotRow, INVENTORY_COLUMNS, PLOT_COLUMNS,
};
use crate::error::{AppError, AppResult};

/// Inventory service
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for creating an inventory unit
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInventoryInput {
    pub category: InventoryCategory,
    #[validate(length(min = 1, max = 1000, message = "Address is required"))]
    pub address: String,
    pub price: Decimal,
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
    /// Free-form list separated by commas, semicolons or newlines
    pub plot_numbers: Option<String>,
}

/// Input for updating an inventory unit
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInventoryInput {
    pub category: Option<InventoryCategory>,
    #[validate(length(min = 1, max = 1000))]
    pub address: Option<String>,
    pub price: Option<Decimal>,
}

/// Query parameters for plot listing
#[derive(Debug, Default, Deserialize)]
pub struct PlotListQuery {
    #[serde(default)]
    pub available_only: bool,
}

/// A plot with its funding so far
#[derive(Debug, Clone, Serialize)]
pub struct FundedPlot {
    #[serde(flatten)]
    pub plot: Plot,
    pub total_paid: Decimal,
    pub contributions: Vec<InvestorContributionSummary>,
}

/// Plots of one assignee within a unit
#[derive(Debug, Clone, Serialize)]
pub struct AssigneeOverview {
    pub salesperson_id: Uuid,
    pub salesperson_name: Option<String>,
    pub plots: Vec<FundedPlot>,
}

/// A unit with its plot breakdown
#[derive(Debug, Clone, Serialize)]
pub struct InventoryOverview {
    #[serde(flatten)]
    pub unit: InventoryUnit,
    pub available_quantity: usize,
    pub plot_assignments: Vec<AssigneeOverview>,
    pub unassigned_plots: Vec<Plot>,
}

/// A unit with its plots
#[derive(Debug, Clone, Serialize)]
pub struct InventoryDetail {
    #[serde(flatten)]
    pub unit: InventoryUnit,
    pub available_quantity: usize,
    pub plots: Vec<Plot>,
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a unit and its plots (admin operation)
    pub async fn create_inventory(&self, input: CreateInventoryInput) -> AppResult<InventoryDetail> {
        input.validate()?;
        validate_positive_amount(input.price).map_err(|msg| AppError::validation("price", msg))?;

        let numbers = resolve_plot_numbers(
            input.category,
            input.quantity,
            input.plot_numbers.as_deref(),
        )?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            INSERT INTO inventory (category, address, price, quantity, status, plot_numbers_input)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            INVENTORY_COLUMNS
        ))
        .bind(input.category.as_str())
        .bind(input.address.trim())
        .bind(input.price)
        .bind(input.quantity)
        .bind(InventoryStatus::Available.as_str())
        .bind(&input.plot_numbers)
        .fetch_one(&mut *tx)
        .await?;
        let unit = InventoryUnit::try_from(row)?;

        let rows = sqlx::query_as::<_, PlotRow>(&format!(
            r#"
            INSERT INTO inventory_plots (inventory_id, plot_number, status)
            SELECT $1, n, $3 FROM UNNEST($2::text[]) AS n
            RETURNING {}
            "#,
            PLOT_COLUMNS
        ))
        .bind(unit.id)
        .bind(&numbers)
        .bind(PlotStatus::Available.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::validation("plot_numbers", "Duplicate plot numbers")
            }
            other => other.into(),
        })?;

        tx.commit().await?;

        tracing::info!(inventory_id = %unit.id, plots = rows.len(), "Inventory created");

        let mut plots = into_plots(rows)?;
        sort_plots(&mut plots);
        Ok(InventoryDetail {
            available_quantity: plots.len(),
            unit,
            plots,
        })
    }

    /// Update descriptive fields and price of a unit (admin operation)
    pub async fn update_inventory(
        &self,
        inventory_id: Uuid,
        input: UpdateInventoryInput,
    ) -> AppResult<InventoryUnit> {
        input.validate()?;
        if let Some(price) = input.price {
            validate_positive_amount(price).map_err(|msg| AppError::validation("price", msg))?;
        }

        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            UPDATE inventory
            SET category = COALESCE($1, category),
                address = COALESCE($2, address),
                price = COALESCE($3, price)
            WHERE id = $4
            RETURNING {}
            "#,
            INVENTORY_COLUMNS
        ))
        .bind(input.category.map(|c| c.as_str()))
        .bind(input.address.as_deref().map(str::trim))
        .bind(input.price)
        .bind(inventory_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;

        row.try_into()
    }

    /// Delete a unit with its plots, assignments, requests and payments.
    ///
    /// Refused while any deal references the unit.
    pub async fn delete_inventory(&self, inventory_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        lock_inventory(&mut *tx, inventory_id).await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM deals WHERE inventory_id = $1)
                OR EXISTS(
                    SELECT 1 FROM deal_plots dp
                    JOIN inventory_plots p ON p.id = dp.plot_id
                    WHERE p.inventory_id = $1
                )
            "#,
        )
        .bind(inventory_id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(AppError::conflict(
                "inventory_id",
                "Inventory is referenced by deals and cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM inventory WHERE id = $1")
            .bind(inventory_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(inventory_id = %inventory_id, "Inventory deleted");

        Ok(())
    }

    /// Role-scoped inventory listing.
    ///
    /// Admins see every unit with plots grouped by assignee plus the
    /// unassigned plots. Salespersons see only units where they hold plots,
    /// and only their own plots and payments within them.
    pub async fn list_inventory(&self, scope: AccessScope) -> AppResult<Vec<InventoryOverview>> {
        let units = self.units_in_scope(scope).await?;
        if units.is_empty() {
            return Ok(Vec::new());
        }

        let unit_ids: Vec<Uuid> = units.iter().map(|u| u.id).collect();
        let plots = self.plots_of_units(&unit_ids).await?;
        let contributions = contributions_for_units(&self.db, &unit_ids, scope).await?;
        let index = InventoryContributionIndex::new(contributions);

        let assignee_ids: Vec<Uuid> = plots.iter().filter_map(|p| p.assigned_to).collect();
        let names = self.user_names(&assignee_ids).await?;

        let mut plots_by_unit: HashMap<Uuid, Vec<Plot>> = HashMap::new();
        for plot in plots {
            if scope.permits(plot.assigned_to) || plot.status.is_allocatable() {
                plots_by_unit.entry(plot.inventory_id).or_default().push(plot);
            }
        }

        Ok(units
            .into_iter()
            .map(|unit| {
                let unit_plots = plots_by_unit.remove(&unit.id).unwrap_or_default();
                let available_quantity =
                    unit_plots.iter().filter(|p| p.status.is_allocatable()).count();
                let (groups, unassigned) = partition_by_assignee(unit_plots);

                let plot_assignments = groups
                    .into_iter()
                    .map(|g| AssigneeOverview {
                        salesperson_name: names.get(&g.salesperson_id).cloned(),
                        salesperson_id: g.salesperson_id,
                        plots: g
                            .plots
                            .into_iter()
                            .map(|plot| FundedPlot {
                                total_paid: index.total_for_plot(plot.id),
                                contributions: index.for_plot(plot.id),
                                plot,
                            })
                            .collect(),
                    })
                    .collect();

                InventoryOverview {
                    unit,
                    available_quantity,
                    plot_assignments,
                    unassigned_plots: if scope.is_unrestricted() {
                        unassigned
                    } else {
                        Vec::new()
                    },
                }
            })
            .collect())
    }

    /// Units open for requests, each with its available plots
    pub async fn list_available(&self) -> AppResult<Vec<InventoryDetail>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            "SELECT {} FROM inventory WHERE status = $1 ORDER BY created_at DESC",
            INVENTORY_COLUMNS
        ))
        .bind(InventoryStatus::Available.as_str())
        .fetch_all(&self.db)
        .await?;
        let units = rows
            .into_iter()
            .map(InventoryUnit::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let unit_ids: Vec<Uuid> = units.iter().map(|u| u.id).collect();
        let mut by_unit: HashMap<Uuid, Vec<Plot>> = HashMap::new();
        for plot in self.plots_of_units(&unit_ids).await? {
            if plot.status.is_allocatable() {
                by_unit.entry(plot.inventory_id).or_default().push(plot);
            }
        }

        Ok(units
            .into_iter()
            .filter_map(|unit| {
                let plots = by_unit.remove(&unit.id)?;
                Some(InventoryDetail {
                    available_quantity: plots.len(),
                    unit,
                    plots,
                })
            })
            .collect())
    }

    /// Get one unit with all its plots
    pub async fn get_inventory(&self, scope: AccessScope, inventory_id: Uuid) -> AppResult<InventoryDetail> {
        let unit = self.visible_unit(scope, inventory_id).await?;
        let plots = self.plots_of_units(&[unit.id]).await?;

        Ok(InventoryDetail {
            available_quantity: plots.iter().filter(|p| p.status.is_allocatable()).count(),
            unit,
            plots,
        })
    }

    /// List plots of a unit, optionally only the available ones
    pub async fn list_plots(
        &self,
        scope: AccessScope,
        inventory_id: Uuid,
        query: PlotListQuery,
    ) -> AppResult<Vec<Plot>> {
        let unit = self.visible_unit(scope, inventory_id).await?;
        let mut plots = self.plots_of_units(&[unit.id]).await?;
        if query.available_only {
            plots.retain(|p| p.status.is_allocatable());
        }
        Ok(plots)
    }

    /// A unit is visible to a salesperson while it is open for requests or
    /// once they hold any of its plots
    async fn visible_unit(&self, scope: AccessScope, inventory_id: Uuid) -> AppResult<InventoryUnit> {
        let row = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {} FROM inventory i
            WHERE i.id = $1
              AND ($2::uuid IS NULL
                   OR i.status = $3
                   OR EXISTS(SELECT 1 FROM inventory_plots p
                             WHERE p.inventory_id = i.id AND p.assigned_to = $2))
            "#,
            INVENTORY_COLUMNS
        ))
        .bind(inventory_id)
        .bind(scope.salesperson_filter())
        .bind(InventoryStatus::Available.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Inventory".to_string()))?;

        row.try_into()
    }

    async fn units_in_scope(&self, scope: AccessScope) -> AppResult<Vec<InventoryUnit>> {
        let rows = sqlx::query_as::<_, InventoryRow>(&format!(
            r#"
            SELECT {} FROM inventory i
            WHERE $1::uuid IS NULL
               OR EXISTS(SELECT 1 FROM inventory_plots p
                         WHERE p.inventory_id = i.id AND p.assigned_to = $1)
            ORDER BY i.created_at DESC
            "#,
            INVENTORY_COLUMNS
        ))
        .bind(scope.salesperson_filter())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(InventoryUnit::try_from).collect()
    }

    async fn plots_of_units(&self, inventory_ids: &[Uuid]) -> AppResult<Vec<Plot>> {
        let rows = sqlx::query_as::<_, PlotRow>(&format!(
            "SELECT {} FROM inventory_plots WHERE inventory_id = ANY($1) \
             ORDER BY length(plot_number), plot_number, id",
            PLOT_COLUMNS
        ))
        .bind(inventory_ids)
        .fetch_all(&self.db)
        .await?;

        into_plots(rows)
    }

    async fn user_names(&self, user_ids: &[Uuid]) -> AppResult<HashMap<Uuid, String>> {
        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM users WHERE id = ANY($1)")
                .bind(user_ids)
                .fetch_all(&self.db)
                .await?;

        Ok(rows.into_iter().collect())
    }
}
