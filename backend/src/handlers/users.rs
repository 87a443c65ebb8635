//! HTTP handlers for the user directory

use axum::{extract::State, Json};
use shared::User;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::users::UserService;
use crate::AppState;

/// Salesperson directory (admin)
pub async fn list_salespersons(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    current_user.0.require_admin()?;
    let service = UserService::new(state.db);
    Ok(Json(service.list_salespersons().await?))
}
