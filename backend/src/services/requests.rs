//! Inventory request workflow
//!
//! `pending -> approved | rejected`. Approval assigns the requested plots in
//! the same transaction and rejects every pending request that competes for
//! any of them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    competing_requests, AccessScope, InventoryRequest, InventoryStatus, Plot, RequestStatus,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::allocation::{assign_locked, AssignmentResult};
use super::plots::{lock_available_plots, lock_inventory, lock_unit_plots, plot_numbers};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

const AUTO_REJECT_NOTE: &str = "Automatically rejected: plots were assigned to another request";

/// Inventory request service
#[derive(Clone)]
pub struct RequestService {
    db: PgPool,
}

/// Input for creating a request
#[derive(Debug, Deserialize)]
pub struct CreateRequestInput {
    pub inventory_id: Uuid,
    /// Omitted means every plot of the unit that is available right now
    pub plot_ids: Option<Vec<Uuid>>,
}

/// Input for approving or rejecting a request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReviewRequestInput {
    #[validate(length(max = 2000))]
    pub admin_notes: Option<String>,
}

/// Request with display details
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    #[serde(flatten)]
    pub request: InventoryRequest,
    pub salesperson_name: Option<String>,
    pub inventory_address: Option<String>,
    pub requested_plot_numbers: Vec<String>,
}

/// Outcome of an approval
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalResult {
    pub message: String,
    pub request: InventoryRequest,
    pub assignment: AssignmentResult,
    pub auto_rejected_request_ids: Vec<Uuid>,
}

/// Database row for request
#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    inventory_id: Uuid,
    salesperson_id: Uuid,
    status: String,
    requested_plot_ids: Vec<Uuid>,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RequestRow> for InventoryRequest {
    type Error = AppError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(InventoryRequest {
            id: row.id,
            inventory_id: row.inventory_id,
            salesperson_id: row.salesperson_id,
            status: row
                .status
                .parse()
                .map_err(|e| AppError::corrupt("request status", e))?,
            requested_plot_ids: row.requested_plot_ids,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for request listing
#[derive(Debug, sqlx::FromRow)]
struct RequestDetailRow {
    #[sqlx(flatten)]
    request: RequestRow,
    salesperson_name: Option<String>,
    inventory_address: Option<String>,
    requested_plot_numbers: Vec<String>,
}

impl TryFrom<RequestDetailRow> for RequestDetail {
    type Error = AppError;

    fn try_from(row: RequestDetailRow) -> Result<Self, Self::Error> {
        Ok(RequestDetail {
            request: row.request.try_into()?,
            salesperson_name: row.salesperson_name,
            inventory_address: row.inventory_address,
            requested_plot_numbers: row.requested_plot_numbers,
        })
    }
}

const REQUEST_COLUMNS: &str =
    "id, inventory_id, salesperson_id, status, requested_plot_ids, admin_notes, created_at, updated_at";

const DETAIL_QUERY: &str = r#"
    SELECT r.id, r.inventory_id, r.salesperson_id, r.status, r.requested_plot_ids,
           r.admin_notes, r.created_at, r.updated_at,
           u.name AS salesperson_name,
           i.address AS inventory_address,
           COALESCE(
               ARRAY(
                   SELECT p.plot_number::text FROM inventory_plots p
                   WHERE p.id = ANY(r.requested_plot_ids)
                   ORDER BY length(p.plot_number), p.plot_number
               ),
               '{}'
           ) AS requested_plot_numbers
    FROM inventory_requests r
    LEFT JOIN users u ON u.id = r.salesperson_id
    LEFT JOIN inventory i ON i.id = r.inventory_id
"#;

impl RequestService {
    /// Create a new RequestService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List requests visible in `scope`, newest first
    pub async fn list_requests(&self, scope: AccessScope) -> AppResult<Vec<RequestDetail>> {
        let rows = sqlx::query_as::<_, RequestDetailRow>(&format!(
            "{} WHERE ($1::uuid IS NULL OR r.salesperson_id = $1) ORDER BY r.created_at DESC",
            DETAIL_QUERY
        ))
        .bind(scope.salesperson_filter())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(RequestDetail::try_from).collect()
    }

    /// Get one request visible in `scope`
    pub async fn get_request(&self, scope: AccessScope, request_id: Uuid) -> AppResult<RequestDetail> {
        let row = sqlx::query_as::<_, RequestDetailRow>(&format!(
            "{} WHERE r.id = $1 AND ($2::uuid IS NULL OR r.salesperson_id = $2)",
            DETAIL_QUERY
        ))
        .bind(request_id)
        .bind(scope.salesperson_filter())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Request".to_string()))?;

        row.try_into()
    }

    /// Create a request for plots of an available unit
    pub async fn create_request(
        &self,
        caller: &AuthUser,
        input: CreateRequestInput,
    ) -> AppResult<InventoryRequest> {
        caller.require_salesperson()?;

        let mut tx = self.db.begin().await?;

        // The unit lock serializes concurrent creates against the same unit
        let unit = lock_inventory(&mut *tx, input.inventory_id).await?;
        if unit.status != InventoryStatus::Available {
            return Err(AppError::conflict(
                "inventory_id",
                "Inventory is not available for request",
            ));
        }

        let plots: Vec<Plot> = match input.plot_ids.as_deref() {
            Some(ids) if !ids.is_empty() => {
                let plots = lock_unit_plots(&mut *tx, unit.id, ids).await?;
                let unavailable: Vec<&Plot> =
                    plots.iter().filter(|p| !p.status.is_allocatable()).collect();
                if !unavailable.is_empty() {
                    return Err(AppError::conflict(
                        "plot_ids",
                        format!("Some plots are not available: {}", plot_numbers(&unavailable)),
                    ));
                }
                plots
            }
            _ => {
                let plots = lock_available_plots(&mut *tx, unit.id).await?;
                if plots.is_empty() {
                    return Err(AppError::conflict(
                        "inventory_id",
                        "Inventory has no available plots",
                    ));
                }
                plots
            }
        };
        let plot_ids: Vec<Uuid> = plots.iter().map(|p| p.id).collect();

        let overlapping = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM inventory_requests
                WHERE salesperson_id = $1 AND inventory_id = $2 AND status = $3
                  AND (requested_plot_ids && $4 OR cardinality(requested_plot_ids) = 0)
            )
            "#,
        )
        .bind(caller.user_id)
        .bind(unit.id)
        .bind(RequestStatus::Pending.as_str())
        .bind(&plot_ids)
        .fetch_one(&mut *tx)
        .await?;

        if overlapping {
            return Err(AppError::conflict(
                "plot_ids",
                "You already have a pending request for some of these plots",
            ));
        }

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            INSERT INTO inventory_requests (inventory_id, salesperson_id, status, requested_plot_ids)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(unit.id)
        .bind(caller.user_id)
        .bind(RequestStatus::Pending.as_str())
        .bind(&plot_ids)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %row.id,
            inventory_id = %unit.id,
            salesperson_id = %caller.user_id,
            plots = plot_ids.len(),
            "Inventory request created"
        );

        row.try_into()
    }

    /// Approve a pending request and assign its plots to the requester
    pub async fn approve_request(
        &self,
        request_id: Uuid,
        input: ReviewRequestInput,
    ) -> AppResult<ApprovalResult> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        // Lock order: unit, then requests
        let inventory_id = sqlx::query_scalar::<_, Uuid>(
            "SELECT inventory_id FROM inventory_requests WHERE id = $1",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Request".to_string()))?;

        let unit = lock_inventory(&mut *tx, inventory_id).await?;

        let request = lock_request(&mut *tx, request_id).await?;
        let status = request
            .status
            .transition(RequestStatus::Approved)
            .map_err(|_| not_pending(request.status))?;

        if unit.status != InventoryStatus::Available {
            return Err(AppError::conflict(
                "inventory_id",
                "Inventory is no longer available",
            ));
        }

        let plot_ids = if request.requested_plot_ids.is_empty() {
            lock_available_plots(&mut *tx, unit.id)
                .await?
                .iter()
                .map(|p| p.id)
                .collect()
        } else {
            request.requested_plot_ids.clone()
        };

        let assignment = assign_locked(
            &mut *tx,
            unit.id,
            &plot_ids,
            request.salesperson_id,
            Decimal::ZERO,
            input.admin_notes.as_deref(),
        )
        .await?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            UPDATE inventory_requests
            SET status = $1, admin_notes = $2, requested_plot_ids = $3
            WHERE id = $4
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status.as_str())
        .bind(&input.admin_notes)
        .bind(&plot_ids)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        let auto_rejected = reject_competitors(&mut *tx, unit.id, request_id, &plot_ids).await?;

        tx.commit().await?;

        tracing::info!(
            request_id = %request_id,
            inventory_id = %unit.id,
            salesperson_id = %request.salesperson_id,
            auto_rejected = auto_rejected.len(),
            "Inventory request approved"
        );

        Ok(ApprovalResult {
            message: "Request approved and plots assigned".to_string(),
            request: row.try_into()?,
            assignment,
            auto_rejected_request_ids: auto_rejected,
        })
    }

    /// Reject a pending request; plots are untouched
    pub async fn reject_request(
        &self,
        request_id: Uuid,
        input: ReviewRequestInput,
    ) -> AppResult<InventoryRequest> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;
        let status = request
            .status
            .transition(RequestStatus::Rejected)
            .map_err(|_| not_pending(request.status))?;

        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE inventory_requests SET status = $1, admin_notes = $2 WHERE id = $3 RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(status.as_str())
        .bind(&input.admin_notes)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(request_id = %request_id, "Inventory request rejected");

        row.try_into()
    }

    /// Delete a request. Salespersons may only delete their own pending requests.
    pub async fn delete_request(&self, caller: &AuthUser, request_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let request = lock_request(&mut *tx, request_id).await?;

        if !caller.is_admin() {
            if request.salesperson_id != caller.user_id {
                return Err(AppError::NotFound("Request".to_string()));
            }
            if request.status != RequestStatus::Pending {
                return Err(AppError::conflict(
                    "status",
                    "Only pending requests can be deleted",
                ));
            }
        }

        sqlx::query("DELETE FROM inventory_requests WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(request_id = %request_id, deleted_by = %caller.user_id, "Inventory request deleted");

        Ok(())
    }
}

fn not_pending(status: RequestStatus) -> AppError {
    AppError::conflict(
        "status",
        format!("Request is not pending (current status: {})", status),
    )
}

async fn lock_request(conn: &mut PgConnection, request_id: Uuid) -> AppResult<InventoryRequest> {
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {} FROM inventory_requests WHERE id = $1 FOR UPDATE",
        REQUEST_COLUMNS
    ))
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Request".to_string()))?;

    row.try_into()
}

/// Reject every other pending request of the unit that competes for `plot_ids`
async fn reject_competitors(
    conn: &mut PgConnection,
    inventory_id: Uuid,
    approved_id: Uuid,
    plot_ids: &[Uuid],
) -> AppResult<Vec<Uuid>> {
    let pending: Vec<(Uuid, Vec<Uuid>)> = sqlx::query_as(
        r#"
        SELECT id, requested_plot_ids FROM inventory_requests
        WHERE inventory_id = $1 AND status = $2 AND id <> $3
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(inventory_id)
    .bind(RequestStatus::Pending.as_str())
    .bind(approved_id)
    .fetch_all(&mut *conn)
    .await?;

    let losers = competing_requests(approved_id, plot_ids, &pending);
    if losers.is_empty() {
        return Ok(losers);
    }
    let rejected = RequestStatus::Pending.transition(RequestStatus::Rejected)?;

    sqlx::query(
        r#"
        UPDATE inventory_requests
        SET status = $1, admin_notes = COALESCE(admin_notes, $2)
        WHERE id = ANY($3)
        "#,
    )
    .bind(rejected.as_str())
    .bind(AUTO_REJECT_NOTE)
    .bind(&losers)
    .execute(&mut *conn)
    .await?;

    Ok(losers)
}
