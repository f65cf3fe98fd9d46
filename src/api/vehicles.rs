//! Vehicle catalog handlers.

use super::{AppState, actor::CurrentActor};
use crate::{
    core::{
        query::{self, SearchFilter, VehicleAdStatus},
        vehicle::{self, VehicleDetail, VehicleDraft},
    },
    entities,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;

/// `GET /vehicles/:id`
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> Result<Json<VehicleDetail>> {
    vehicle::get_vehicle(&state.db, vehicle_id, Utc::now().date_naive())
        .await
        .map(Json)
}

/// `PUT /vehicles/:id`
pub async fn update_vehicle(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(vehicle_id): Path<i64>,
    Json(draft): Json<VehicleDraft>,
) -> Result<Json<entities::vehicle::Model>> {
    vehicle::update_vehicle(&state.db, vehicle_id, &actor, draft)
        .await
        .map(Json)
}

/// `GET /vehicles/:id/status`
pub async fn ad_status(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> Result<Json<VehicleAdStatus>> {
    query::vehicle_ad_status(&state.db, vehicle_id, Utc::now().date_naive())
        .await
        .map(Json)
}

/// `GET /vehicles/search`
pub async fn search(
    State(state): State<AppState>,
    Query(filter): Query<SearchFilter>,
) -> Result<Json<Vec<VehicleDetail>>> {
    query::search_vehicles(&state.db, &filter, Utc::now().date_naive())
        .await
        .map(Json)
}
