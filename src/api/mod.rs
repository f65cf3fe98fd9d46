//! HTTP surface - axum router over the marketplace core.
//!
//! Handlers are thin: they extract the actor, the path and the body, call one
//! [`crate::core`] operation and serialize its result. Errors become responses
//! through the [`axum::response::IntoResponse`] impl in [`error`].

/// Acting-user extraction from request headers
pub mod actor;
/// Error to HTTP response mapping
pub mod error;
/// Listing lifecycle and listing queries
pub mod listings;
/// Payment reports
pub mod payments;
/// Vehicle catalog
pub mod vehicles;

use crate::config::MarketSettings;
use axum::{
    Json, Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Market settings loaded at startup
    pub settings: Arc<MarketSettings>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok`
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/listings", get(listings::list_active).post(listings::create))
        .route("/listings/featured", get(listings::list_featured))
        .route("/listings/sold", get(listings::list_sold))
        .route("/listings/mine", get(listings::list_mine))
        .route("/listings/mine/sold", get(listings::list_my_sold))
        .route("/listings/purchased", get(listings::list_purchased))
        .route(
            "/listings/:id",
            get(listings::get_listing).delete(listings::withdraw),
        )
        .route("/listings/:id/detail", get(listings::get_detail))
        .route("/listings/:id/sold", get(listings::get_sold_detail))
        .route("/listings/:id/feature", post(listings::feature))
        .route("/listings/:id/purchase", post(listings::purchase))
        .route("/vehicles/search", get(vehicles::search))
        .route(
            "/vehicles/:id",
            get(vehicles::get_vehicle).put(vehicles::update_vehicle),
        )
        .route("/vehicles/:id/status", get(vehicles::ad_status))
        .route("/payments/mine", get(payments::my_payments))
        .route("/admin/payments", get(payments::list_payments))
        .route("/admin/revenue", get(payments::revenue_summary))
        .route("/admin/revenue/by-type", get(payments::report_by_type))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
