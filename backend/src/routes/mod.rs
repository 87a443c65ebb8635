//! Route definitions for the sales CRM API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected_routes(state))
}

/// Everything behind the bearer token
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/inventory", inventory_routes())
        .nest("/inventory-requests", request_routes())
        .nest("/investors", investor_routes())
        .nest("/inventory-payments", payment_routes())
        .nest("/deals", deal_routes())
        .nest("/users", user_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Inventory, plot allocation and per-unit ledger views
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_inventory).post(handlers::create_inventory),
        )
        .route("/available", get(handlers::list_available_inventory))
        .route(
            "/:inventory_id",
            get(handlers::get_inventory)
                .put(handlers::update_inventory)
                .delete(handlers::delete_inventory),
        )
        .route("/:inventory_id/plots", get(handlers::list_inventory_plots))
        .route("/:inventory_id/assign", post(handlers::assign_plots))
        .route("/:inventory_id/assignments", get(handlers::list_assignments))
        .route("/:inventory_id/payments", get(handlers::list_inventory_payments))
        .route(
            "/:inventory_id/contributions",
            get(handlers::get_inventory_contributions),
        )
        .route(
            "/:inventory_id/plots/:plot_id/contributions",
            get(handlers::get_plot_contributions),
        )
}

/// Salesperson requests and admin review
fn request_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_requests).post(handlers::create_request))
        .route(
            "/:request_id",
            get(handlers::get_request).delete(handlers::delete_request),
        )
        .route("/:request_id/approve", post(handlers::approve_request))
        .route("/:request_id/reject", post(handlers::reject_request))
}

/// Owner-private investors
fn investor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_investors).post(handlers::create_investor))
        .route("/balances", get(handlers::get_investor_balances))
        .route(
            "/:investor_id",
            get(handlers::get_investor)
                .put(handlers::update_investor)
                .delete(handlers::delete_investor),
        )
}

/// Payment ledger
fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_payments).post(handlers::record_payment))
        .route(
            "/balance/:salesperson_id",
            get(handlers::get_salesperson_balance),
        )
        .route(
            "/balance/:salesperson_id/investors",
            get(handlers::get_salesperson_investor_balances),
        )
        .route(
            "/:payment_id",
            put(handlers::update_payment).delete(handlers::delete_payment),
        )
}

fn deal_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_deals).post(handlers::create_deal))
        .route("/:deal_id", get(handlers::get_deal))
        .route("/:deal_id/plots", post(handlers::attach_deal_plots))
}

fn user_routes() -> Router<AppState> {
    Router::new().route("/salespersons", get(handlers::list_salespersons))
}
