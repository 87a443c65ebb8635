//! HTTP handlers for deals and deal-plot consumption

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Deal;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::deals::{AttachPlotsInput, CreateDealInput, DealDetail, DealService};
use crate::AppState;

pub async fn list_deals(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Deal>>> {
    let service = DealService::new(state.db);
    Ok(Json(service.list_deals(current_user.0.scope()).await?))
}

pub async fn get_deal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(deal_id): Path<Uuid>,
) -> AppResult<Json<DealDetail>> {
    let service = DealService::new(state.db);
    Ok(Json(service.get_deal(current_user.0.scope(), deal_id).await?))
}

/// Create a deal, optionally consuming plots in the same transaction
pub async fn create_deal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDealInput>,
) -> AppResult<(StatusCode, Json<DealDetail>)> {
    let service = DealService::new(state.db);
    let deal = service.create_deal(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(deal)))
}

/// Attach plots to an existing deal
pub async fn attach_deal_plots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(deal_id): Path<Uuid>,
    Json(input): Json<AttachPlotsInput>,
) -> AppResult<Json<DealDetail>> {
    let service = DealService::new(state.db);
    let deal = service
        .attach_plots(&current_user.0, deal_id, input)
        .await?;
    Ok(Json(deal))
}
