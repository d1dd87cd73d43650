//! Calendar routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::SharedState;
use crate::error::GatewayError;
use crate::google::calendar::{CreateEvent, EventPatch, ListEvents, DEFAULT_CALENDAR};
use crate::google::CalendarApi;

async fn calendar_api(state: &SharedState) -> Result<CalendarApi, GatewayError> {
    let client = state.sessions.authenticated_client().await?;
    Ok(CalendarApi::new(client))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    calendar_id: Option<String>,
    time_min: Option<String>,
    time_max: Option<String>,
    max_results: Option<u32>,
    q: Option<String>,
    page_token: Option<String>,
    /// `calendars`, `today`, or `events` (default).
    view: Option<String>,
}

/// GET /api/calendar
pub(super) async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, GatewayError> {
    let calendar = calendar_api(&state).await?;

    match query.view.as_deref() {
        Some("calendars") => {
            let calendars = calendar.list_calendars().await?;
            Ok(Json(json!({ "success": true, "data": calendars })))
        }
        Some("today") => {
            let events = calendar.today_events(query.calendar_id.as_deref()).await?;
            Ok(Json(json!({ "success": true, "data": events })))
        }
        _ => {
            let params = ListEvents {
                calendar_id: query.calendar_id,
                time_min: query.time_min,
                time_max: query.time_max,
                max_results: query.max_results,
                query: query.q,
                page_token: query.page_token,
            };
            let page = calendar.list_events(&params).await?;
            Ok(Json(json!({ "success": true, "data": page })))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateBody {
    calendar_id: Option<String>,
    #[serde(flatten)]
    event: CreateEvent,
}

/// POST /api/calendar
pub(super) async fn create(
    State(state): State<SharedState>,
    Json(body): Json<CreateBody>,
) -> Result<Json<Value>, GatewayError> {
    if body.event.summary.is_empty()
        || body.event.start_date_time.is_empty()
        || body.event.end_date_time.is_empty()
    {
        return Err(GatewayError::BadRequest(
            "missing required fields: summary, startDateTime, endDateTime".to_string(),
        ));
    }
    let calendar = calendar_api(&state).await?;
    let calendar_id = body.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR);
    let event = calendar.create_event(calendar_id, &body.event).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Event created successfully",
        "data": event,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CalendarIdQuery {
    calendar_id: Option<String>,
}

/// GET /api/calendar/{id}
pub(super) async fn get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<CalendarIdQuery>,
) -> Result<Json<Value>, GatewayError> {
    let calendar = calendar_api(&state).await?;
    let calendar_id = query.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR);
    let event = calendar.get_event(calendar_id, &id).await?;
    Ok(Json(json!({ "success": true, "data": event })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateBody {
    calendar_id: Option<String>,
    #[serde(flatten)]
    patch: EventPatch,
}

/// PATCH /api/calendar/{id}
pub(super) async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Value>, GatewayError> {
    let calendar = calendar_api(&state).await?;
    let calendar_id = body.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR);
    let event = calendar.update_event(calendar_id, &id, &body.patch).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Event updated",
        "data": event,
    })))
}

/// DELETE /api/calendar/{id}
pub(super) async fn remove(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<CalendarIdQuery>,
) -> Result<Json<Value>, GatewayError> {
    let calendar = calendar_api(&state).await?;
    let calendar_id = query.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR);
    calendar.delete_event(calendar_id, &id).await?;
    Ok(Json(json!({ "success": true, "message": "Event deleted" })))
}
