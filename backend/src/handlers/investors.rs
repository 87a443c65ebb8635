//! HTTP handlers for investors and balances

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Investor, InvestorBalance, SalespersonBalance};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::investors::{CreateInvestorInput, InvestorService, UpdateInvestorInput};
use crate::AppState;

/// List the caller's investors
pub async fn list_investors(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Investor>>> {
    let service = InvestorService::new(state.db);
    Ok(Json(service.list_investors(current_user.0.user_id).await?))
}

/// Get one of the caller's investors
pub async fn get_investor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(investor_id): Path<Uuid>,
) -> AppResult<Json<Investor>> {
    let service = InvestorService::new(state.db);
    let investor = service
        .get_investor(current_user.0.user_id, investor_id)
        .await?;
    Ok(Json(investor))
}

/// Create an investor
pub async fn create_investor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInvestorInput>,
) -> AppResult<(StatusCode, Json<Investor>)> {
    let service = InvestorService::new(state.db);
    let investor = service
        .create_investor(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(investor)))
}

/// Update an investor
pub async fn update_investor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(investor_id): Path<Uuid>,
    Json(input): Json<UpdateInvestorInput>,
) -> AppResult<Json<Investor>> {
    let service = InvestorService::new(state.db);
    let investor = service
        .update_investor(current_user.0.user_id, investor_id, input)
        .await?;
    Ok(Json(investor))
}

/// Delete an investor
pub async fn delete_investor(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(investor_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = InvestorService::new(state.db);
    service
        .delete_investor(current_user.0.user_id, investor_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Per-investor balances of the caller's investors
pub async fn get_investor_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InvestorBalance>>> {
    let service = InvestorService::new(state.db);
    let balances = service
        .get_investor_balances(&current_user.0, current_user.0.user_id)
        .await?;
    Ok(Json(balances))
}

/// Per-investor balances of a salesperson
pub async fn get_salesperson_investor_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(salesperson_id): Path<Uuid>,
) -> AppResult<Json<Vec<InvestorBalance>>> {
    let service = InvestorService::new(state.db);
    let balances = service
        .get_investor_balances(&current_user.0, salesperson_id)
        .await?;
    Ok(Json(balances))
}

/// Aggregate balance of a salesperson
pub async fn get_salesperson_balance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(salesperson_id): Path<Uuid>,
) -> AppResult<Json<SalespersonBalance>> {
    let service = InvestorService::new(state.db);
    let balance = service
        .get_salesperson_balance(&current_user.0, salesperson_id)
        .await?;
    Ok(Json(balance))
}
