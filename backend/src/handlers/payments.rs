//! HTTP handlers for investor-funded plot payments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{InventoryPayment, InvestorContributionSummary};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::payments::{
    PaymentDetail, PaymentService, RecordPaymentInput, RecordPaymentResult, UpdatePaymentInput,
};
use crate::AppState;

/// List payments scoped to the caller
pub async fn list_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<PaymentDetail>>> {
    let service = PaymentService::new(state.db);
    Ok(Json(service.list_payments(current_user.0.scope()).await?))
}

/// List payments recorded against one unit
pub async fn list_inventory_payments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<Vec<PaymentDetail>>> {
    let service = PaymentService::new(state.db);
    let payments = service
        .list_inventory_payments(current_user.0.scope(), inventory_id)
        .await?;
    Ok(Json(payments))
}

/// Record a multi-investor payment against a plot
pub async fn record_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordPaymentInput>,
) -> AppResult<(StatusCode, Json<RecordPaymentResult>)> {
    let service = PaymentService::new(state.db);
    let result = service.record_payment(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn update_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(payment_id): Path<Uuid>,
    Json(input): Json<UpdatePaymentInput>,
) -> AppResult<Json<InventoryPayment>> {
    let service = PaymentService::new(state.db);
    let payment = service
        .update_payment(&current_user.0, payment_id, input)
        .await?;
    Ok(Json(payment))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(payment_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = PaymentService::new(state.db);
    service.delete_payment(&current_user.0, payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Investor contributions per plot of a unit
pub async fn get_inventory_contributions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<Vec<InvestorContributionSummary>>> {
    let service = PaymentService::new(state.db);
    let contributions = service
        .inventory_contributions(current_user.0.scope(), inventory_id)
        .await?;
    Ok(Json(contributions))
}

/// Investor contributions for a single plot
pub async fn get_plot_contributions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((inventory_id, plot_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<InvestorContributionSummary>>> {
    let service = PaymentService::new(state.db);
    let contributions = service
        .plot_contributions(&current_user.0, inventory_id, plot_id)
        .await?;
    Ok(Json(contributions))
}
