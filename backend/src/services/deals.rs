//! Deal records and deal-plot consumption
//!
//! Binding a plot to a deal moves it to `used_in_deal`, after which it can
//! never be assigned, requested or consumed again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    sort_plots, validate_non_negative_amount, AccessScope, Deal, DealFinancials, DealPlot,
    DealStatus, Plot, PlotStatus,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::plots::{
    into_plots, lock_inventory, lock_unit_plots, plot_numbers, refresh_inventory_status,
    set_plot_status, PlotRow, PLOT_COLUMNS,
};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Deal service
#[derive(Clone)]
pub struct DealService {
    db: PgPool,
}

/// Input for creating a deal
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDealInput {
    pub inventory_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[validate(length(max = 50))]
    pub property_type: Option<String>,
    pub status: Option<DealStatus>,
    pub original_price: Decimal,
    pub sale_price: Decimal,
    pub plot_ids: Option<Vec<Uuid>>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
}

/// Input for attaching plots to an existing deal
#[derive(Debug, Deserialize, Validate)]
pub struct AttachPlotsInput {
    pub plot_ids: Option<Vec<Uuid>>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
}

/// Which plots a deal consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotSelection {
    /// Exactly these plots
    Plots(Vec<Uuid>),
    /// Any `n` eligible plots, lowest plot numbers first
    Quantity(i32),
}

impl PlotSelection {
    pub fn from_input(plot_ids: Option<Vec<Uuid>>, quantity: Option<i32>) -> Option<Self> {
        match (plot_ids, quantity) {
            (Some(ids), _) if !ids.is_empty() => Some(PlotSelection::Plots(ids)),
            (_, Some(n)) if n > 0 => Some(PlotSelection::Quantity(n)),
            _ => None,
        }
    }
}

/// Deal with its consumed plots
#[derive(Debug, Clone, Serialize)]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: Deal,
    pub plots: Vec<DealPlot>,
}

/// Database row for deal
#[derive(Debug, sqlx::FromRow)]
struct DealRow {
    id: Uuid,
    salesperson_id: Uuid,
    inventory_id: Option<Uuid>,
    customer_id: Option<Uuid>,
    property_type: Option<String>,
    status: String,
    original_price: Decimal,
    sale_price: Decimal,
    profit: Decimal,
    profit_percentage: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DealRow> for Deal {
    type Error = AppError;

    fn try_from(row: DealRow) -> Result<Self, Self::Error> {
        Ok(Deal {
            id: row.id,
            salesperson_id: row.salesperson_id,
            inventory_id: row.inventory_id,
            customer_id: row.customer_id,
            property_type: row.property_type,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::corrupt("deal status", e))?,
            original_price: row.original_price,
            sale_price: row.sale_price,
            profit: row.profit,
            profit_percentage: row.profit_percentage,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for deal plot
#[derive(Debug, sqlx::FromRow)]
struct DealPlotRow {
    deal_id: Uuid,
    plot_id: Uuid,
    plot_number: String,
    created_at: DateTime<Utc>,
}

impl From<DealPlotRow> for DealPlot {
    fn from(row: DealPlotRow) -> Self {
        DealPlot {
            deal_id: row.deal_id,
            plot_id: row.plot_id,
            plot_number: row.plot_number,
            created_at: row.created_at,
        }
    }
}

const DEAL_COLUMNS: &str = "id, salesperson_id, inventory_id, customer_id, property_type, status, \
     original_price, sale_price, profit, profit_percentage, created_at, updated_at";

impl DealService {
    /// Create a new DealService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a deal, consuming plots in the same transaction when any are selected
    pub async fn create_deal(&self, caller: &AuthUser, input: CreateDealInput) -> AppResult<DealDetail> {
        input.validate()?;
        validate_non_negative_amount(input.original_price)
            .map_err(|msg| AppError::validation("original_price", msg))?;
        validate_non_negative_amount(input.sale_price)
            .map_err(|msg| AppError::validation("sale_price", msg))?;

        let selection = PlotSelection::from_input(input.plot_ids, input.quantity);
        if selection.is_some() && input.inventory_id.is_none() {
            return Err(AppError::validation(
                "inventory_id",
                "An inventory unit is required to use plots",
            ));
        }

        let financials = DealFinancials::compute(input.original_price, input.sale_price)
            .map_err(|msg| AppError::validation("sale_price", msg))?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, DealRow>(&format!(
            r#"
            INSERT INTO deals (salesperson_id, inventory_id, customer_id, property_type, status,
                               original_price, sale_price, profit, profit_percentage)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            DEAL_COLUMNS
        ))
        .bind(caller.user_id)
        .bind(input.inventory_id)
        .bind(input.customer_id)
        .bind(&input.property_type)
        .bind(input.status.unwrap_or_default().as_str())
        .bind(input.original_price)
        .bind(input.sale_price)
        .bind(financials.profit)
        .bind(financials.profit_percentage)
        .fetch_one(&mut *tx)
        .await?;
        let deal = Deal::try_from(row)?;

        if let (Some(selection), Some(inventory_id)) = (selection, deal.inventory_id) {
            consume_locked(&mut *tx, caller, deal.id, inventory_id, selection).await?;
        }

        let plots = deal_plots(&mut *tx, deal.id).await?;

        tx.commit().await?;

        tracing::info!(deal_id = %deal.id, plots = plots.len(), "Deal created");

        Ok(DealDetail { deal, plots })
    }

    /// Bind plots of the deal's unit to an existing deal
    pub async fn attach_plots(
        &self,
        caller: &AuthUser,
        deal_id: Uuid,
        input: AttachPlotsInput,
    ) -> AppResult<DealDetail> {
        input.validate()?;
        let selection = PlotSelection::from_input(input.plot_ids, input.quantity).ok_or_else(|| {
            AppError::validation("plot_ids", "Please select at least one plot")
        })?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals WHERE id = $1 AND ($2::uuid IS NULL OR salesperson_id = $2) FOR UPDATE",
            DEAL_COLUMNS
        ))
        .bind(deal_id)
        .bind(caller.scope().salesperson_filter())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;
        let deal = Deal::try_from(row)?;

        let inventory_id = deal.inventory_id.ok_or_else(|| {
            AppError::validation("inventory_id", "Deal has no inventory unit selected")
        })?;

        consume_locked(&mut *tx, caller, deal.id, inventory_id, selection).await?;
        let plots = deal_plots(&mut *tx, deal.id).await?;

        tx.commit().await?;

        Ok(DealDetail { deal, plots })
    }

    /// Get a deal visible in `scope`
    pub async fn get_deal(&self, scope: AccessScope, deal_id: Uuid) -> AppResult<DealDetail> {
        let row = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals WHERE id = $1 AND ($2::uuid IS NULL OR salesperson_id = $2)",
            DEAL_COLUMNS
        ))
        .bind(deal_id)
        .bind(scope.salesperson_filter())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Deal".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let plots = deal_plots(&mut *conn, deal_id).await?;

        Ok(DealDetail {
            deal: row.try_into()?,
            plots,
        })
    }

    /// List deals visible in `scope`, newest first
    pub async fn list_deals(&self, scope: AccessScope) -> AppResult<Vec<Deal>> {
        let rows = sqlx::query_as::<_, DealRow>(&format!(
            "SELECT {} FROM deals WHERE ($1::uuid IS NULL OR salesperson_id = $1) ORDER BY created_at DESC",
            DEAL_COLUMNS
        ))
        .bind(scope.salesperson_filter())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Deal::try_from).collect()
    }
}

/// Consume plots for a deal inside an open transaction
pub(crate) async fn consume_locked(
    conn: &mut PgConnection,
    caller: &AuthUser,
    deal_id: Uuid,
    inventory_id: Uuid,
    selection: PlotSelection,
) -> AppResult<Vec<Plot>> {
    lock_inventory(&mut *conn, inventory_id).await?;
    let scope = caller.scope();

    let plots = match selection {
        PlotSelection::Plots(ids) => {
            let plots = lock_unit_plots(&mut *conn, inventory_id, &ids).await?;

            let unusable: Vec<&Plot> = plots.iter().filter(|p| !p.status.is_consumable()).collect();
            if !unusable.is_empty() {
                return Err(AppError::conflict(
                    "plot_ids",
                    format!("Some plots are not available for this deal: {}", plot_numbers(&unusable)),
                ));
            }
            if plots.iter().any(|p| !scope.permits(p.assigned_to)) {
                return Err(AppError::Forbidden(
                    "You can only use plots assigned to you".to_string(),
                ));
            }
            plots
        }
        PlotSelection::Quantity(requested) => {
            let rows = sqlx::query_as::<_, PlotRow>(&format!(
                r#"
                SELECT {} FROM inventory_plots
                WHERE inventory_id = $1 AND status IN ($2, $3)
                  AND ($4::uuid IS NULL OR assigned_to = $4)
                ORDER BY id
                FOR UPDATE
                "#,
                PLOT_COLUMNS
            ))
            .bind(inventory_id)
            .bind(PlotStatus::Assigned.as_str())
            .bind(PlotStatus::Paid.as_str())
            .bind(scope.salesperson_filter())
            .fetch_all(&mut *conn)
            .await?;

            let mut eligible = into_plots(rows)?;
            sort_plots(&mut eligible);
            if eligible.len() < requested as usize {
                return Err(AppError::conflict(
                    "quantity",
                    format!(
                        "Insufficient inventory quantity. Available: {}, Requested: {}",
                        eligible.len(),
                        requested
                    ),
                ));
            }
            eligible.truncate(requested as usize);
            eligible
        }
    };

    for plot in &plots {
        sqlx::query("INSERT INTO deal_plots (deal_id, plot_id) VALUES ($1, $2)")
            .bind(deal_id)
            .bind(plot.id)
            .execute(&mut *conn)
            .await?;
        set_plot_status(&mut *conn, plot, PlotStatus::UsedInDeal).await?;
    }

    refresh_inventory_status(&mut *conn, inventory_id).await?;

    tracing::info!(
        deal_id = %deal_id,
        inventory_id = %inventory_id,
        plots = plots.len(),
        "Plots consumed by deal"
    );

    Ok(plots)
}

async fn deal_plots(conn: &mut PgConnection, deal_id: Uuid) -> AppResult<Vec<DealPlot>> {
    let rows = sqlx::query_as::<_, DealPlotRow>(
        r#"
        SELECT dp.deal_id, dp.plot_id, p.plot_number, dp.created_at
        FROM deal_plots dp
        JOIN inventory_plots p ON p.id = dp.plot_id
        WHERE dp.deal_id = $1
        ORDER BY length(p.plot_number), p.plot_number
        "#,
    )
    .bind(deal_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}
