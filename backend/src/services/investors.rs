//! Investor records and the funding ledger projections
//!
//! Investors are private to the salesperson who owns them, admins included.
//! `paid_amount` and `remaining_balance` are caches; balance decisions are
//! always made from `SUM(inventory_payments.amount)`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Investor, InvestorBalance, LedgerPosition, SalespersonBalance};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Investor service
#[derive(Clone)]
pub struct InvestorService {
    db: PgPool,
}

/// Input for creating an investor
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvestorInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total_invested: Decimal,
}

/// Input for updating an investor
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateInvestorInput {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub total_invested: Option<Decimal>,
}

/// Database row for investor
#[derive(Debug, sqlx::FromRow)]
struct InvestorRow {
    id: Uuid,
    salesperson_id: Uuid,
    name: String,
    phone: Option<String>,
    address: Option<String>,
    total_invested: Decimal,
    paid_amount: Decimal,
    remaining_balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvestorRow> for Investor {
    fn from(row: InvestorRow) -> Self {
        Investor {
            id: row.id,
            salesperson_id: row.salesperson_id,
            name: row.name,
            phone: row.phone,
            address: row.address,
            total_invested: row.total_invested,
            paid_amount: row.paid_amount,
            remaining_balance: row.remaining_balance,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INVESTOR_COLUMNS: &str = "id, salesperson_id, name, phone, address, total_invested, \
     paid_amount, remaining_balance, created_at, updated_at";

/// An investor row locked for a ledger mutation
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LockedInvestor {
    pub id: Uuid,
    pub salesperson_id: Uuid,
    pub name: String,
    pub total_invested: Decimal,
}

/// Ledger-derived balance row
#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    id: Uuid,
    name: String,
    total_invested: Decimal,
    used_balance: Decimal,
}

impl InvestorService {
    /// Create a new InvestorService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List the caller's own investors
    pub async fn list_investors(&self, owner_id: Uuid) -> AppResult<Vec<Investor>> {
        let rows = sqlx::query_as::<_, InvestorRow>(&format!(
            "SELECT {} FROM investors WHERE salesperson_id = $1 ORDER BY name",
            INVESTOR_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get one of the caller's own investors
    pub async fn get_investor(&self, owner_id: Uuid, investor_id: Uuid) -> AppResult<Investor> {
        let row = sqlx::query_as::<_, InvestorRow>(&format!(
            "SELECT {} FROM investors WHERE id = $1 AND salesperson_id = $2",
            INVESTOR_COLUMNS
        ))
        .bind(investor_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Investor".to_string()))?;

        Ok(row.into())
    }

    /// Create an investor owned by the caller
    pub async fn create_investor(
        &self,
        owner_id: Uuid,
        input: CreateInvestorInput,
    ) -> AppResult<Investor> {
        input.validate()?;
        LedgerPosition::new(Decimal::ZERO, Decimal::ZERO)
            .ensure_commitment(&input.name, input.total_invested)?;

        let row = sqlx::query_as::<_, InvestorRow>(&format!(
            r#"
            INSERT INTO investors (salesperson_id, name, phone, address, total_invested,
                                   paid_amount, remaining_balance)
            VALUES ($1, $2, $3, $4, $5, 0, $5)
            RETURNING {}
            "#,
            INVESTOR_COLUMNS
        ))
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.total_invested)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(investor_id = %row.id, salesperson_id = %owner_id, "Investor created");

        Ok(row.into())
    }

    /// Update one of the caller's investors; the commitment may not drop below what is spent
    pub async fn update_investor(
        &self,
        owner_id: Uuid,
        investor_id: Uuid,
        input: UpdateInvestorInput,
    ) -> AppResult<Investor> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let investor = lock_investors(&mut *tx, &[investor_id])
            .await?
            .into_iter()
            .find(|i| i.salesperson_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Investor".to_string()))?;

        if let Some(total_invested) = input.total_invested {
            ledger_position(&mut *tx, &investor)
                .await?
                .ensure_commitment(&investor.name, total_invested)?;
        }

        sqlx::query(
            r#"
            UPDATE investors
            SET name = COALESCE($1, name),
                phone = COALESCE($2, phone),
                address = COALESCE($3, address),
                total_invested = COALESCE($4, total_invested)
            WHERE id = $5
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(input.total_invested)
        .bind(investor_id)
        .execute(&mut *tx)
        .await?;

        rebuild_investor_cache(&mut *tx, investor_id).await?;

        let row = sqlx::query_as::<_, InvestorRow>(&format!(
            "SELECT {} FROM investors WHERE id = $1",
            INVESTOR_COLUMNS
        ))
        .bind(investor_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Delete one of the caller's investors; its payments stay in the ledger unlinked
    pub async fn delete_investor(&self, owner_id: Uuid, investor_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM investors WHERE id = $1 AND salesperson_id = $2")
            .bind(investor_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Investor".to_string()));
        }

        tracing::info!(investor_id = %investor_id, "Investor deleted");

        Ok(())
    }

    /// Aggregate balance of a salesperson's investors, derived from the ledger.
    ///
    /// Salespersons may only read their own balance.
    pub async fn get_salesperson_balance(
        &self,
        caller: &AuthUser,
        salesperson_id: Uuid,
    ) -> AppResult<SalespersonBalance> {
        ensure_can_view_balance(caller, salesperson_id)?;

        let positions: Vec<LedgerPosition> = self
            .balance_rows(salesperson_id)
            .await?
            .iter()
            .map(|r| LedgerPosition::new(r.total_invested, r.used_balance))
            .collect();

        Ok(SalespersonBalance::from_positions(&positions))
    }

    /// Per-investor balances of a salesperson's investors, derived from the ledger.
    ///
    /// Admins may read any salesperson; salespersons only themselves.
    pub async fn get_investor_balances(
        &self,
        caller: &AuthUser,
        salesperson_id: Uuid,
    ) -> AppResult<Vec<InvestorBalance>> {
        ensure_can_view_balance(caller, salesperson_id)?;

        Ok(self
            .balance_rows(salesperson_id)
            .await?
            .into_iter()
            .map(|r| {
                InvestorBalance::new(
                    r.id,
                    r.name,
                    LedgerPosition::new(r.total_invested, r.used_balance),
                )
            })
            .collect())
    }

    async fn balance_rows(&self, salesperson_id: Uuid) -> AppResult<Vec<BalanceRow>> {
        let rows = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT i.id, i.name, i.total_invested,
                   COALESCE(SUM(p.amount), 0) AS used_balance
            FROM investors i
            LEFT JOIN inventory_payments p ON p.investor_id = i.id
            WHERE i.salesperson_id = $1
            GROUP BY i.id, i.name, i.total_invested
            ORDER BY i.name
            "#,
        )
        .bind(salesperson_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}

fn ensure_can_view_balance(caller: &AuthUser, salesperson_id: Uuid) -> AppResult<()> {
    if caller.scope().permits(Some(salesperson_id)) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You can only view your own balance".to_string(),
        ))
    }
}

/// Lock investors by id, in id order. Unknown ids fail with NotFound.
pub(crate) async fn lock_investors(
    conn: &mut PgConnection,
    investor_ids: &[Uuid],
) -> AppResult<Vec<LockedInvestor>> {
    let mut ids = investor_ids.to_vec();
    ids.sort();
    ids.dedup();

    let rows = sqlx::query_as::<_, LockedInvestor>(
        r#"
        SELECT id, salesperson_id, name, total_invested
        FROM investors
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() != ids.len() {
        return Err(AppError::NotFound("Investor".to_string()));
    }
    Ok(rows)
}

/// Current ledger position of a locked investor
pub(crate) async fn ledger_position(
    conn: &mut PgConnection,
    investor: &LockedInvestor,
) -> AppResult<LedgerPosition> {
    let used = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM inventory_payments WHERE investor_id = $1",
    )
    .bind(investor.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(LedgerPosition::new(investor.total_invested, used))
}

/// Rewrite an investor's cached columns from the payment ledger
pub(crate) async fn rebuild_investor_cache(
    conn: &mut PgConnection,
    investor_id: Uuid,
) -> AppResult<()> {
    sqlx::query(
        r#"
        UPDATE investors i
        SET paid_amount = l.used,
            remaining_balance = i.total_invested - l.used
        FROM (
            SELECT COALESCE(SUM(amount), 0) AS used
            FROM inventory_payments
            WHERE investor_id = $1
        ) l
        WHERE i.id = $1
        "#,
    )
    .bind(investor_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
