//! Investor funding ledger: inventory payments
//!
//! Every mutation runs in one transaction that locks the unit, the plot and
//! the investors involved, checks balances against the ledger itself, writes
//! the payment rows, rebuilds the investor caches and promotes the plot when
//! it is fully paid.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    normalize_contributions, validate_positive_amount, AccessScope, InventoryPayment,
    InventoryUnit, InvestorContribution, InvestorContributionSummary, Plot, PlotStatus,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::investors::{ledger_position, lock_investors, rebuild_investor_cache};
use super::plots::{lock_inventory, lock_unit_plots, refresh_inventory_status, set_plot_status};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Inventory payment service
#[derive(Clone)]
pub struct PaymentService {
    db: PgPool,
}

/// Input for recording a payment
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentInput {
    pub inventory_id: Uuid,
    pub plot_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one investor is required"))]
    pub investors: Vec<InvestorContribution>,
    pub payment_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Input for correcting a payment
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePaymentInput {
    pub amount: Option<Decimal>,
    pub payment_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Outcome of recording a payment
#[derive(Debug, Clone, Serialize)]
pub struct RecordPaymentResult {
    pub message: String,
    pub payments: Vec<InventoryPayment>,
    pub total_amount: Decimal,
    pub plot_status: PlotStatus,
}

/// Payment with display details
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDetail {
    #[serde(flatten)]
    pub payment: InventoryPayment,
    pub investor_name: Option<String>,
    pub plot_number: Option<String>,
    pub inventory_address: Option<String>,
}

/// Database row for payment
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    inventory_id: Uuid,
    plot_id: Option<Uuid>,
    investor_id: Option<Uuid>,
    salesperson_id: Uuid,
    amount: Decimal,
    payment_date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for InventoryPayment {
    fn from(row: PaymentRow) -> Self {
        InventoryPayment {
            id: row.id,
            inventory_id: row.inventory_id,
            plot_id: row.plot_id,
            investor_id: row.investor_id,
            salesperson_id: row.salesperson_id,
            amount: row.amount,
            payment_date: row.payment_date,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// Database row for payment listing
#[derive(Debug, sqlx::FromRow)]
struct PaymentDetailRow {
    #[sqlx(flatten)]
    payment: PaymentRow,
    investor_name: Option<String>,
    plot_number: Option<String>,
    inventory_address: Option<String>,
}

impl From<PaymentDetailRow> for PaymentDetail {
    fn from(row: PaymentDetailRow) -> Self {
        PaymentDetail {
            payment: row.payment.into(),
            investor_name: row.investor_name,
            plot_number: row.plot_number,
            inventory_address: row.inventory_address,
        }
    }
}

/// Database row for contribution summaries
#[derive(Debug, sqlx::FromRow)]
struct ContributionRow {
    investor_id: Option<Uuid>,
    investor_name: Option<String>,
    plot_id: Option<Uuid>,
    plot_number: Option<String>,
    total_amount: Decimal,
    payment_count: i64,
}

impl From<ContributionRow> for InvestorContributionSummary {
    fn from(row: ContributionRow) -> Self {
        InvestorContributionSummary {
            investor_id: row.investor_id,
            investor_name: row.investor_name,
            plot_id: row.plot_id,
            plot_number: row.plot_number,
            total_amount: row.total_amount,
            payment_count: row.payment_count,
        }
    }
}

const PAYMENT_COLUMNS: &str =
    "id, inventory_id, plot_id, investor_id, salesperson_id, amount, payment_date, notes, created_at";

const DETAIL_QUERY: &str = r#"
    SELECT p.id, p.inventory_id, p.plot_id, p.investor_id, p.salesperson_id, p.amount,
           p.payment_date, p.notes, p.created_at,
           inv.name AS investor_name,
           pl.plot_number AS plot_number,
           i.address AS inventory_address
    FROM inventory_payments p
    LEFT JOIN investors inv ON inv.id = p.investor_id
    LEFT JOIN inventory_plots pl ON pl.id = p.plot_id
    LEFT JOIN inventory i ON i.id = p.inventory_id
"#;

impl PaymentService {
    /// Create a new PaymentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record one payment row per contributing investor against a plot
    pub async fn record_payment(
        &self,
        caller: &AuthUser,
        input: RecordPaymentInput,
    ) -> AppResult<RecordPaymentResult> {
        input.validate()?;

        let plot_id = input
            .plot_id
            .ok_or_else(|| AppError::validation("plot_id", "A plot must be selected"))?;
        let (contributions, total_amount) = normalize_contributions(&input.investors)?;
        for c in &contributions {
            validate_positive_amount(c.amount).map_err(|msg| AppError::validation("amount", msg))?;
        }
        let payment_date = input.payment_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let unit = lock_inventory(&mut *tx, input.inventory_id).await?;
        let plot = lock_payable_plot(&mut *tx, caller, unit.id, plot_id).await?;

        let investor_ids: Vec<Uuid> = contributions.iter().map(|c| c.investor_id).collect();
        let investors = lock_investors(&mut *tx, &investor_ids).await?;

        // Ownership is decided by the investor's salesperson, whatever the caller's role
        if let Some(foreign) = investors.iter().find(|i| i.salesperson_id != caller.user_id) {
            return Err(AppError::Forbidden(format!(
                "Investor {} not found or does not belong to you",
                foreign.id
            )));
        }

        for c in &contributions {
            let investor = investors
                .iter()
                .find(|i| i.id == c.investor_id)
                .ok_or_else(|| AppError::NotFound("Investor".to_string()))?;
            let position = ledger_position(&mut *tx, investor).await?;
            if let Err(err) = position.ensure_can_cover(&investor.name, c.amount) {
                tracing::warn!(
                    investor_id = %investor.id,
                    requested = %c.amount,
                    available = %position.remaining(),
                    "Payment rejected, insufficient balance"
                );
                return Err(err.into());
            }
        }

        let mut payments = Vec::with_capacity(contributions.len());
        for c in &contributions {
            let row = sqlx::query_as::<_, PaymentRow>(&format!(
                r#"
                INSERT INTO inventory_payments (
                    inventory_id, plot_id, investor_id, salesperson_id, amount, payment_date, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING {}
                "#,
                PAYMENT_COLUMNS
            ))
            .bind(unit.id)
            .bind(plot.id)
            .bind(c.investor_id)
            .bind(caller.user_id)
            .bind(c.amount)
            .bind(payment_date)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

            rebuild_investor_cache(&mut *tx, c.investor_id).await?;
            payments.push(InventoryPayment::from(row));
        }

        let plot_status = promote_if_paid(&mut *tx, &plot, unit.price).await?;

        tx.commit().await?;

        tracing::info!(
            inventory_id = %unit.id,
            plot_id = %plot.id,
            investors = payments.len(),
            total = %total_amount,
            plot_status = %plot_status,
            "Inventory payment recorded"
        );

        Ok(RecordPaymentResult {
            message: "Payments created successfully".to_string(),
            payments,
            total_amount,
            plot_status,
        })
    }

    /// Correct a payment's amount, date or notes.
    ///
    /// A new amount is checked against the investor's ledger with the old
    /// amount released. The plot may be promoted, never demoted.
    pub async fn update_payment(
        &self,
        caller: &AuthUser,
        payment_id: Uuid,
        input: UpdatePaymentInput,
    ) -> AppResult<InventoryPayment> {
        input.validate()?;
        if let Some(amount) = input.amount {
            validate_positive_amount(amount).map_err(|msg| AppError::validation("amount", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let (unit, payment) = lock_payment(&mut *tx, caller.scope(), payment_id).await?;
        let plot = match payment.plot_id {
            Some(plot_id) => lock_unit_plots(&mut *tx, unit.id, &[plot_id]).await?.pop(),
            None => None,
        };

        if let (Some(amount), Some(investor_id)) = (input.amount, payment.investor_id) {
            let investor = lock_investors(&mut *tx, &[investor_id])
                .await?
                .pop()
                .ok_or_else(|| AppError::NotFound("Investor".to_string()))?;
            let position = ledger_position(&mut *tx, &investor).await?;
            position
                .with_replaced_payment(payment.amount, Decimal::ZERO)
                .ensure_can_cover(&investor.name, amount)?;
        }

        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            UPDATE inventory_payments
            SET amount = COALESCE($1, amount),
                payment_date = COALESCE($2, payment_date),
                notes = COALESCE($3, notes)
            WHERE id = $4
            RETURNING {}
            "#,
            PAYMENT_COLUMNS
        ))
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(&input.notes)
        .bind(payment_id)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(investor_id) = row.investor_id {
            rebuild_investor_cache(&mut *tx, investor_id).await?;
        }
        if let Some(plot) = &plot {
            promote_if_paid(&mut *tx, plot, unit.price).await?;
        }

        tx.commit().await?;

        tracing::info!(payment_id = %payment_id, amount = %row.amount, "Inventory payment updated");

        Ok(row.into())
    }

    /// Delete a payment and release its amount back to the investor.
    ///
    /// A plot already promoted to `paid` keeps that status.
    pub async fn delete_payment(&self, caller: &AuthUser, payment_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let (_, payment) = lock_payment(&mut *tx, caller.scope(), payment_id).await?;
        if let Some(investor_id) = payment.investor_id {
            lock_investors(&mut *tx, &[investor_id]).await?;
        }

        sqlx::query("DELETE FROM inventory_payments WHERE id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await?;

        if let Some(investor_id) = payment.investor_id {
            rebuild_investor_cache(&mut *tx, investor_id).await?;
        }

        tx.commit().await?;

        tracing::info!(
            payment_id = %payment_id,
            amount = %payment.amount,
            "Inventory payment deleted"
        );

        Ok(())
    }

    /// List payments visible in `scope`, newest first
    pub async fn list_payments(&self, scope: AccessScope) -> AppResult<Vec<PaymentDetail>> {
        let rows = sqlx::query_as::<_, PaymentDetailRow>(&format!(
            "{} WHERE ($1::uuid IS NULL OR p.salesperson_id = $1) \
             ORDER BY p.payment_date DESC, p.created_at DESC",
            DETAIL_QUERY
        ))
        .bind(scope.salesperson_filter())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List payments of one unit visible in `scope`
    pub async fn list_inventory_payments(
        &self,
        scope: AccessScope,
        inventory_id: Uuid,
    ) -> AppResult<Vec<PaymentDetail>> {
        let rows = sqlx::query_as::<_, PaymentDetailRow>(&format!(
            "{} WHERE p.inventory_id = $1 AND ($2::uuid IS NULL OR p.salesperson_id = $2) \
             ORDER BY p.payment_date DESC, p.created_at DESC",
            DETAIL_QUERY
        ))
        .bind(inventory_id)
        .bind(scope.salesperson_filter())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Investor contribution totals per plot of one unit
    pub async fn inventory_contributions(
        &self,
        scope: AccessScope,
        inventory_id: Uuid,
    ) -> AppResult<Vec<InvestorContributionSummary>> {
        contributions_for_units(&self.db, &[inventory_id], scope).await
    }

    /// Investor contribution totals toward one plot.
    ///
    /// Salespersons may only inspect plots assigned to them.
    pub async fn plot_contributions(
        &self,
        caller: &AuthUser,
        inventory_id: Uuid,
        plot_id: Uuid,
    ) -> AppResult<Vec<InvestorContributionSummary>> {
        let assigned_to = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT assigned_to FROM inventory_plots WHERE id = $1 AND inventory_id = $2",
        )
        .bind(plot_id)
        .bind(inventory_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Plot".to_string()))?;

        if !caller.scope().permits(assigned_to) {
            return Err(AppError::Forbidden(
                "Plot not found or not assigned to you".to_string(),
            ));
        }

        let rows = sqlx::query_as::<_, ContributionRow>(
            r#"
            SELECT p.investor_id, inv.name AS investor_name,
                   p.plot_id, pl.plot_number AS plot_number,
                   SUM(p.amount) AS total_amount, COUNT(*) AS payment_count
            FROM inventory_payments p
            LEFT JOIN investors inv ON inv.id = p.investor_id
            LEFT JOIN inventory_plots pl ON pl.id = p.plot_id
            WHERE p.inventory_id = $1 AND p.plot_id = $2
            GROUP BY p.investor_id, inv.name, p.plot_id, pl.plot_number
            ORDER BY total_amount DESC
            "#,
        )
        .bind(inventory_id)
        .bind(plot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Investor totals per plot across a set of units, limited to payments in `scope`
pub(crate) async fn contributions_for_units(
    db: &PgPool,
    inventory_ids: &[Uuid],
    scope: AccessScope,
) -> AppResult<Vec<InvestorContributionSummary>> {
    let rows = sqlx::query_as::<_, ContributionRow>(
        r#"
        SELECT p.investor_id, inv.name AS investor_name,
               p.plot_id, pl.plot_number AS plot_number,
               SUM(p.amount) AS total_amount, COUNT(*) AS payment_count
        FROM inventory_payments p
        LEFT JOIN investors inv ON inv.id = p.investor_id
        LEFT JOIN inventory_plots pl ON pl.id = p.plot_id
        WHERE p.inventory_id = ANY($1) AND ($2::uuid IS NULL OR p.salesperson_id = $2)
        GROUP BY p.investor_id, inv.name, p.plot_id, pl.plot_number
        ORDER BY length(pl.plot_number), pl.plot_number, inv.name
        "#,
    )
    .bind(inventory_ids)
    .bind(scope.salesperson_filter())
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Lock the plot a payment is recorded against and check the caller may fund it
async fn lock_payable_plot(
    conn: &mut PgConnection,
    caller: &AuthUser,
    inventory_id: Uuid,
    plot_id: Uuid,
) -> AppResult<Plot> {
    let plot = lock_unit_plots(&mut *conn, inventory_id, &[plot_id])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Plot".to_string()))?;

    if !caller.scope().permits(plot.assigned_to) {
        return Err(AppError::Forbidden(
            "Plot not found or not assigned to you".to_string(),
        ));
    }
    if plot.status.is_allocatable() {
        return Err(AppError::conflict(
            "plot_id",
            format!("Plot {} must be assigned before it can be paid", plot.plot_number),
        ));
    }
    Ok(plot)
}

/// Lock the unit a payment belongs to, then the payment row itself
async fn lock_payment(
    conn: &mut PgConnection,
    scope: AccessScope,
    payment_id: Uuid,
) -> AppResult<(InventoryUnit, InventoryPayment)> {
    let inventory_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT inventory_id FROM inventory_payments WHERE id = $1",
    )
    .bind(payment_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

    let unit = lock_inventory(&mut *conn, inventory_id).await?;
    let payment = find_payment(&mut *conn, scope, payment_id).await?;
    Ok((unit, payment))
}

/// Lock a payment row visible in `scope`
async fn find_payment(
    conn: &mut PgConnection,
    scope: AccessScope,
    payment_id: Uuid,
) -> AppResult<InventoryPayment> {
    let row = sqlx::query_as::<_, PaymentRow>(&format!(
        "SELECT {} FROM inventory_payments \
         WHERE id = $1 AND ($2::uuid IS NULL OR salesperson_id = $2) FOR UPDATE",
        PAYMENT_COLUMNS
    ))
    .bind(payment_id)
    .bind(scope.salesperson_filter())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Payment".to_string()))?;

    Ok(row.into())
}

/// Promote a plot to `paid` once its payments reach the unit price
async fn promote_if_paid(conn: &mut PgConnection, plot: &Plot, price: Decimal) -> AppResult<PlotStatus> {
    let total_paid = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM inventory_payments WHERE plot_id = $1",
    )
    .bind(plot.id)
    .fetch_one(&mut *conn)
    .await?;

    let next = plot.status.after_payment(total_paid, price);
    if next != plot.status {
        set_plot_status(&mut *conn, plot, next).await?;
        refresh_inventory_status(&mut *conn, plot.inventory_id).await?;
    }
    Ok(next)
}
