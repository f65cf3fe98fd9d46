//! Payment reporting handlers. Everything except `/payments/mine` is admin-only.

use super::{AppState, actor::CurrentActor};
use crate::{
    core::report::{self, PaymentFilter, PaymentView, RevenueSummary, TypeReportRow},
    errors::Result,
};
use axum::{
    Json,
    extract::{Query, State},
};

/// `GET /admin/payments`
pub async fn list_payments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<PaymentView>>> {
    report::list_payments(&state.db, &actor, filter)
        .await
        .map(Json)
}

/// `GET /admin/revenue`
pub async fn revenue_summary(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<RevenueSummary>> {
    report::revenue_summary(&state.db, &actor, filter)
        .await
        .map(Json)
}

/// `GET /admin/revenue/by-type`
pub async fn report_by_type(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<TypeReportRow>>> {
    report::report_by_type(&state.db, &actor, filter)
        .await
        .map(Json)
}

/// `GET /payments/mine`
pub async fn my_payments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PaymentFilter>,
) -> Result<Json<Vec<PaymentView>>> {
    report::my_payments(&state.db, &actor, filter)
        .await
        .map(Json)
}
