//! HTTP handlers for the inventory request workflow

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::InventoryRequest;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::requests::{
    ApprovalResult, CreateRequestInput, RequestDetail, RequestService, ReviewRequestInput,
};
use crate::AppState;

/// List requests scoped to the caller
pub async fn list_requests(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RequestDetail>>> {
    let service = RequestService::new(state.db);
    Ok(Json(service.list_requests(current_user.0.scope()).await?))
}

/// Get a request
pub async fn get_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<Json<RequestDetail>> {
    let service = RequestService::new(state.db);
    let request = service
        .get_request(current_user.0.scope(), request_id)
        .await?;
    Ok(Json(request))
}

/// Create a request (salesperson)
pub async fn create_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateRequestInput>,
) -> AppResult<(StatusCode, Json<InventoryRequest>)> {
    let service = RequestService::new(state.db);
    let request = service.create_request(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Approve a request (admin)
pub async fn approve_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    input: Option<Json<ReviewRequestInput>>,
) -> AppResult<Json<ApprovalResult>> {
    current_user.0.require_admin()?;
    let service = RequestService::new(state.db);
    let input = input.map(|Json(i)| i).unwrap_or_default();
    Ok(Json(service.approve_request(request_id, input).await?))
}

/// Reject a request (admin)
pub async fn reject_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
    input: Option<Json<ReviewRequestInput>>,
) -> AppResult<Json<InventoryRequest>> {
    current_user.0.require_admin()?;
    let service = RequestService::new(state.db);
    let input = input.map(|Json(i)| i).unwrap_or_default();
    Ok(Json(service.reject_request(request_id, input).await?))
}

/// Delete a request
pub async fn delete_request(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(request_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = RequestService::new(state.db);
    service.delete_request(&current_user.0, request_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
