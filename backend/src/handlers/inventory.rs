//! HTTP handlers for inventory units and plot allocation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{InventoryUnit, Plot, PlotAssignment};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::allocation::{AllocationService, AssignPlotsInput, AssignmentResult};
use crate::services::inventory::{
    CreateInventoryInput, InventoryDetail, InventoryOverview, InventoryService, PlotListQuery,
    UpdateInventoryInput,
};
use crate::AppState;

/// List inventory scoped to the caller
pub async fn list_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryOverview>>> {
    let service = InventoryService::new(state.db);
    let units = service.list_inventory(current_user.0.scope()).await?;
    Ok(Json(units))
}

/// List units open for requests
pub async fn list_available_inventory(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryDetail>>> {
    let service = InventoryService::new(state.db);
    Ok(Json(service.list_available().await?))
}

/// Get a unit with its plots
pub async fn get_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<InventoryDetail>> {
    let service = InventoryService::new(state.db);
    let unit = service
        .get_inventory(current_user.0.scope(), inventory_id)
        .await?;
    Ok(Json(unit))
}

/// List plots of a unit
pub async fn list_inventory_plots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Query(query): Query<PlotListQuery>,
) -> AppResult<Json<Vec<Plot>>> {
    let service = InventoryService::new(state.db);
    let plots = service
        .list_plots(current_user.0.scope(), inventory_id, query)
        .await?;
    Ok(Json(plots))
}

/// Create a unit (admin)
pub async fn create_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInventoryInput>,
) -> AppResult<(StatusCode, Json<InventoryDetail>)> {
    current_user.0.require_admin()?;
    let service = InventoryService::new(state.db);
    let unit = service.create_inventory(input).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

/// Update a unit (admin)
pub async fn update_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<UpdateInventoryInput>,
) -> AppResult<Json<InventoryUnit>> {
    current_user.0.require_admin()?;
    let service = InventoryService::new(state.db);
    let unit = service.update_inventory(inventory_id, input).await?;
    Ok(Json(unit))
}

/// Delete a unit (admin)
pub async fn delete_inventory(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    current_user.0.require_admin()?;
    let service = InventoryService::new(state.db);
    service.delete_inventory(inventory_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Assign plots of a unit to a salesperson (admin)
pub async fn assign_plots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
    Json(input): Json<AssignPlotsInput>,
) -> AppResult<Json<AssignmentResult>> {
    current_user.0.require_admin()?;
    let service = AllocationService::new(state.db);
    let result = service.assign_plots(inventory_id, input).await?;
    Ok(Json(result))
}

/// Assignment history of a unit (admin)
pub async fn list_assignments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(inventory_id): Path<Uuid>,
) -> AppResult<Json<Vec<PlotAssignment>>> {
    current_user.0.require_admin()?;
    let service = AllocationService::new(state.db);
    Ok(Json(service.list_assignments(inventory_id).await?))
}
