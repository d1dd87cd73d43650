//! GA4 routes.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::SharedState;
use crate::error::GatewayError;
use crate::google::analytics::ReportRequest;
use crate::google::AnalyticsApi;

async fn analytics_api(state: &SharedState) -> Result<AnalyticsApi, GatewayError> {
    let property_id = state
        .config
        .ga4_property_id
        .clone()
        .ok_or_else(|| GatewayError::Config("GA4_PROPERTY_ID is not set".to_string()))?;
    let client = state.sessions.authenticated_client().await?;
    Ok(AnalyticsApi::new(client, property_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ViewQuery {
    /// `overview` (default) or `topPages`.
    view: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<i64>,
}

/// GET /api/ga4
pub(super) async fn view(
    State(state): State<SharedState>,
    Query(query): Query<ViewQuery>,
) -> Result<Json<Value>, GatewayError> {
    let analytics = analytics_api(&state).await?;
    let start = query.start_date.as_deref();
    let end = query.end_date.as_deref();

    let report = match query.view.as_deref() {
        Some("topPages") => analytics.top_pages(start, end, query.limit).await?,
        _ => analytics.traffic_overview(start, end).await?,
    };
    Ok(Json(json!({ "success": true, "data": report })))
}

/// POST /api/ga4
pub(super) async fn run_report(
    State(state): State<SharedState>,
    Json(body): Json<ReportRequest>,
) -> Result<Json<Value>, GatewayError> {
    if body.metrics.is_empty() {
        return Err(GatewayError::BadRequest(
            "at least one metric is required".to_string(),
        ));
    }
    let analytics = analytics_api(&state).await?;
    let report = analytics.run_report(&body).await?;
    Ok(Json(json!({ "success": true, "data": report })))
}
