//! Calendar pass-through: calendars, event CRUD, today view.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::client::{expect_empty, expect_json, AuthorizedClient};
use crate::error::GatewayError;

pub const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_CALENDAR: &str = "primary";

#[derive(Debug, Clone, Serialize)]
pub struct CalendarSummary {
    pub id: String,
    pub summary: String,
    pub primary: bool,
}

/// Start/end of an event, as Google represents it: either a datetime or an
/// all-day date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub events: Vec<CalendarEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Create-event parameters, as posted to the calendar route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start_date_time: String,
    pub end_date_time: String,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

/// Partial update; unset fields keep the existing event's values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub start_date_time: Option<String>,
    #[serde(default)]
    pub end_date_time: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub attendees: Option<Vec<String>>,
}

/// List-events parameters.
#[derive(Debug, Clone, Default)]
pub struct ListEvents {
    pub calendar_id: Option<String>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: Option<u32>,
    pub query: Option<String>,
    pub page_token: Option<String>,
}

// Wire shapes from the Calendar API.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}

#[derive(Debug, Deserialize)]
struct CalendarListEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    primary: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<RawEvent>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    id: Option<String>,
    #[serde(default)]
    summary: String,
    description: Option<String>,
    location: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    attendees: Option<Vec<Attendee>>,
    status: Option<String>,
    html_link: Option<String>,
}

/// Calendar API wrapper over an authenticated client.
pub struct CalendarApi {
    client: AuthorizedClient,
    base_url: String,
}

impl CalendarApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self {
            client,
            base_url: CALENDAR_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn list_calendars(&self) -> Result<Vec<CalendarSummary>, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/users/me/calendarList", self.base_url))
            .send()
            .await?;
        let list: CalendarListResponse = expect_json(resp).await?;
        Ok(list
            .items
            .into_iter()
            .map(|item| CalendarSummary {
                id: item.id,
                summary: item.summary,
                primary: item.primary,
            })
            .collect())
    }

    /// Upcoming single events ordered by start time. `time_min` defaults to
    /// now.
    pub async fn list_events(&self, params: &ListEvents) -> Result<EventPage, GatewayError> {
        let calendar_id = params.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR);
        let time_min = params
            .time_min
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        let mut query: Vec<(&str, String)> = vec![
            ("timeMin", time_min),
            ("maxResults", params.max_results.unwrap_or(10).to_string()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(time_max) = &params.time_max {
            query.push(("timeMax", time_max.clone()));
        }
        if let Some(q) = &params.query {
            query.push(("q", q.clone()));
        }
        if let Some(token) = &params.page_token {
            query.push(("pageToken", token.clone()));
        }

        let resp = self
            .client
            .get(format!("{}/calendars/{calendar_id}/events", self.base_url))
            .query(&query)
            .send()
            .await?;
        let list: EventListResponse = expect_json(resp).await?;
        Ok(EventPage {
            events: list.items.into_iter().map(parse_event).collect(),
            next_page_token: list.next_page_token,
        })
    }

    pub async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<CalendarEvent, GatewayError> {
        let resp = self
            .client
            .get(format!(
                "{}/calendars/{calendar_id}/events/{event_id}",
                self.base_url
            ))
            .send()
            .await?;
        let raw: RawEvent = expect_json(resp).await?;
        Ok(parse_event(raw))
    }

    pub async fn create_event(
        &self,
        calendar_id: &str,
        params: &CreateEvent,
    ) -> Result<CalendarEvent, GatewayError> {
        let body = serde_json::json!({
            "summary": params.summary,
            "description": params.description,
            "location": params.location,
            "start": {
                "dateTime": normalize_datetime(&params.start_date_time),
                "timeZone": params.time_zone.as_deref().unwrap_or("UTC"),
            },
            "end": {
                "dateTime": normalize_datetime(&params.end_date_time),
                "timeZone": params.time_zone.as_deref().unwrap_or("UTC"),
            },
            "attendees": params.attendees.as_ref().map(|emails| {
                emails
                    .iter()
                    .map(|email| serde_json::json!({ "email": email }))
                    .collect::<Vec<_>>()
            }),
        });
        let resp = self
            .client
            .post(format!("{}/calendars/{calendar_id}/events", self.base_url))
            .query(&[("sendNotifications", "true")])
            .json(&body)
            .send()
            .await?;
        let raw: RawEvent = expect_json(resp).await?;
        Ok(parse_event(raw))
    }

    /// Full update assembled from the existing event overlaid with the
    /// patch.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent, GatewayError> {
        let existing = self.get_event(calendar_id, event_id).await?;

        let start = match &patch.start_date_time {
            Some(dt) => serde_json::json!({
                "dateTime": normalize_datetime(dt),
                "timeZone": patch.time_zone.as_deref().unwrap_or("UTC"),
            }),
            None => serde_json::to_value(&existing.start)?,
        };
        let end = match &patch.end_date_time {
            Some(dt) => serde_json::json!({
                "dateTime": normalize_datetime(dt),
                "timeZone": patch.time_zone.as_deref().unwrap_or("UTC"),
            }),
            None => serde_json::to_value(&existing.end)?,
        };
        let attendees = match &patch.attendees {
            Some(emails) => serde_json::to_value(
                emails
                    .iter()
                    .map(|email| serde_json::json!({ "email": email }))
                    .collect::<Vec<_>>(),
            )?,
            None => serde_json::to_value(&existing.attendees)?,
        };

        let body = serde_json::json!({
            "summary": patch.summary.clone().unwrap_or(existing.summary),
            "description": patch.description.clone().or(existing.description),
            "location": patch.location.clone().or(existing.location),
            "start": start,
            "end": end,
            "attendees": attendees,
        });
        let resp = self
            .client
            .put(format!(
                "{}/calendars/{calendar_id}/events/{event_id}",
                self.base_url
            ))
            .json(&body)
            .send()
            .await?;
        let raw: RawEvent = expect_json(resp).await?;
        Ok(parse_event(raw))
    }

    pub async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), GatewayError> {
        let resp = self
            .client
            .delete(format!(
                "{}/calendars/{calendar_id}/events/{event_id}",
                self.base_url
            ))
            .send()
            .await?;
        expect_empty(resp).await
    }

    /// Events between the start and end of the current UTC day.
    pub async fn today_events(
        &self,
        calendar_id: Option<&str>,
    ) -> Result<Vec<CalendarEvent>, GatewayError> {
        let today = Utc::now().date_naive();
        let params = ListEvents {
            calendar_id: calendar_id.map(str::to_string),
            time_min: Some(format!("{today}T00:00:00Z")),
            time_max: Some(format!("{today}T23:59:59Z")),
            max_results: Some(50),
            ..Default::default()
        };
        Ok(self.list_events(&params).await?.events)
    }
}

/// Append seconds to datetimes that stop at minutes, so Google gets full
/// RFC 3339. Inputs that already carry seconds, `Z`, or an offset pass
/// through untouched.
fn normalize_datetime(dt: &str) -> String {
    static MINUTE_PRECISION: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let re = MINUTE_PRECISION.get_or_init(|| Regex::new(r"T\d{2}:\d{2}$").expect("literal regex"));
    if re.is_match(dt) {
        format!("{dt}:00")
    } else {
        dt.to_string()
    }
}

fn parse_event(raw: RawEvent) -> CalendarEvent {
    CalendarEvent {
        id: raw.id,
        summary: raw.summary,
        description: raw.description,
        location: raw.location,
        start: raw.start.unwrap_or_default(),
        end: raw.end.unwrap_or_default(),
        attendees: raw.attendees,
        status: raw.status,
        html_link: raw.html_link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_appends_seconds_to_minute_precision() {
        assert_eq!(
            normalize_datetime("2026-02-21T10:07"),
            "2026-02-21T10:07:00"
        );
    }

    #[test]
    fn normalize_leaves_full_datetimes_alone() {
        assert_eq!(
            normalize_datetime("2026-02-21T10:07:00"),
            "2026-02-21T10:07:00"
        );
        assert_eq!(
            normalize_datetime("2026-02-21T10:07:00Z"),
            "2026-02-21T10:07:00Z"
        );
        assert_eq!(
            normalize_datetime("2026-02-21T10:07:00+06:30"),
            "2026-02-21T10:07:00+06:30"
        );
    }

    #[test]
    fn parse_event_defaults_missing_times() {
        let raw: RawEvent = serde_json::from_value(serde_json::json!({
            "id": "e1",
            "summary": "standup",
            "status": "confirmed"
        }))
        .unwrap();
        let event = parse_event(raw);
        assert_eq!(event.id.as_deref(), Some("e1"));
        assert_eq!(event.summary, "standup");
        assert!(event.start.date_time.is_none());
        assert!(event.attendees.is_none());
    }
}
