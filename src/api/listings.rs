//! Listing handlers: lifecycle transitions and listing queries.

use super::{
    AppState,
    actor::{CurrentActor, OptionalActor, idempotency_key},
};
use crate::{
    core::{
        listing::{self, CreatedListing},
        query::{self, ListingView, Page},
        vehicle::VehicleDraft,
    },
    entities::advertisement,
    errors::Result,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{NaiveDate, Utc};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// `POST /listings`
pub async fn create(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(draft): Json<VehicleDraft>,
) -> Result<(StatusCode, Json<CreatedListing>)> {
    let created = listing::create_listing(&state.db, &state.settings, draft, actor.id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `POST /listings/:id/feature`
pub async fn feature(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ad_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<advertisement::Model>> {
    let key = idempotency_key(&headers);
    listing::feature_listing(&state.db, &state.settings, ad_id, &actor, key)
        .await
        .map(Json)
}

/// `POST /listings/:id/purchase`
pub async fn purchase(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ad_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<advertisement::Model>> {
    let key = idempotency_key(&headers);
    listing::purchase_listing(&state.db, &state.settings, ad_id, &actor, key)
        .await
        .map(Json)
}

/// `DELETE /listings/:id`
pub async fn withdraw(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ad_id): Path<i64>,
) -> Result<Json<advertisement::Model>> {
    listing::withdraw_listing(&state.db, ad_id, &actor)
        .await
        .map(Json)
}

/// `GET /listings/:id`. Anonymous callers only see open listings.
pub async fn get_listing(
    State(state): State<AppState>,
    OptionalActor(viewer): OptionalActor,
    Path(ad_id): Path<i64>,
) -> Result<Json<ListingView>> {
    query::get_listing(&state.db, ad_id, viewer.as_ref(), today())
        .await
        .map(Json)
}

/// `GET /listings/:id/detail`
pub async fn get_detail(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ad_id): Path<i64>,
) -> Result<Json<ListingView>> {
    query::get_listing_detail(&state.db, ad_id, &actor, today())
        .await
        .map(Json)
}

/// `GET /listings/:id/sold`
pub async fn get_sold_detail(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(ad_id): Path<i64>,
) -> Result<Json<ListingView>> {
    query::get_sold_detail(&state.db, ad_id, &actor, today())
        .await
        .map(Json)
}

/// `GET /listings`
pub async fn list_active(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ListingView>>> {
    query::list_active(&state.db, page, today()).await.map(Json)
}

/// `GET /listings/featured`
pub async fn list_featured(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ListingView>>> {
    query::list_featured(&state.db, page, today()).await.map(Json)
}

/// `GET /listings/sold`
pub async fn list_sold(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ListingView>>> {
    query::list_sold(&state.db, page, today()).await.map(Json)
}

/// `GET /listings/mine`
pub async fn list_mine(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ListingView>>> {
    query::list_mine(&state.db, &actor, page, today())
        .await
        .map(Json)
}

/// `GET /listings/mine/sold`
pub async fn list_my_sold(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ListingView>>> {
    query::list_my_sold(&state.db, &actor, page, today())
        .await
        .map(Json)
}

/// `GET /listings/purchased`
pub async fn list_purchased(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(page): Query<Page>,
) -> Result<Json<Vec<ListingView>>> {
    query::list_purchased(&state.db, &actor, page, today())
        .await
        .map(Json)
}
