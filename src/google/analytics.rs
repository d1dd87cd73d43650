//! GA4 Data API pass-through: `runReport` plus two canned reports.

use serde::{Deserialize, Serialize};

use super::client::{expect_json, AuthorizedClient};
use crate::error::GatewayError;

pub const ANALYTICS_BASE_URL: &str = "https://analyticsdata.googleapis.com/v1beta";

const DEFAULT_ROW_LIMIT: i64 = 100;

/// Report parameters, as accepted by the GA4 route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// e.g. `2024-01-01` or `7daysAgo`.
    pub start_date: String,
    /// e.g. `2024-01-31` or `today`.
    pub end_date: String,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBy {
    pub field_name: String,
    #[serde(default)]
    pub descending: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderName {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub metric_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellValue {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<CellValue>,
    #[serde(default)]
    pub metric_values: Vec<CellValue>,
}

/// Reshaped report, the same shape the original surface exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub dimension_headers: Vec<HeaderName>,
    pub metric_headers: Vec<MetricHeader>,
    pub rows: Vec<ReportRow>,
    pub row_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunReportResponse {
    #[serde(default)]
    dimension_headers: Vec<HeaderName>,
    #[serde(default)]
    metric_headers: Vec<MetricHeader>,
    #[serde(default)]
    rows: Vec<ReportRow>,
    #[serde(default)]
    row_count: i64,
}

/// GA4 Data API wrapper bound to one property.
pub struct AnalyticsApi {
    client: AuthorizedClient,
    base_url: String,
    property_id: String,
}

impl AnalyticsApi {
    pub fn new(client: AuthorizedClient, property_id: impl Into<String>) -> Self {
        Self {
            client,
            base_url: ANALYTICS_BASE_URL.to_string(),
            property_id: property_id.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn run_report(&self, params: &ReportRequest) -> Result<ReportResponse, GatewayError> {
        let body = serde_json::json!({
            "dateRanges": [{ "startDate": params.start_date, "endDate": params.end_date }],
            "metrics": params.metrics.iter()
                .map(|name| serde_json::json!({ "name": name }))
                .collect::<Vec<_>>(),
            "dimensions": params.dimensions.iter()
                .map(|name| serde_json::json!({ "name": name }))
                .collect::<Vec<_>>(),
            "limit": params.limit.unwrap_or(DEFAULT_ROW_LIMIT),
            "orderBys": params.order_by.iter()
                .map(|o| serde_json::json!({
                    "metric": { "metricName": o.field_name },
                    "desc": o.descending.unwrap_or(true),
                }))
                .collect::<Vec<_>>(),
        });

        let resp = self
            .client
            .post(format!(
                "{}/properties/{}:runReport",
                self.base_url, self.property_id
            ))
            .json(&body)
            .send()
            .await?;
        let raw: RunReportResponse = expect_json(resp).await?;
        Ok(ReportResponse {
            dimension_headers: raw.dimension_headers,
            metric_headers: raw.metric_headers,
            rows: raw.rows,
            row_count: raw.row_count,
        })
    }

    /// Daily traffic metrics for a date range (defaults: last 7 days).
    pub async fn traffic_overview(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<ReportResponse, GatewayError> {
        self.run_report(&ReportRequest {
            start_date: start_date.unwrap_or("7daysAgo").to_string(),
            end_date: end_date.unwrap_or("today").to_string(),
            metrics: [
                "sessions",
                "activeUsers",
                "newUsers",
                "screenPageViews",
                "bounceRate",
                "averageSessionDuration",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            dimensions: vec!["date".to_string()],
            limit: None,
            order_by: vec![OrderBy {
                field_name: "date".to_string(),
                descending: Some(false),
            }],
        })
        .await
    }

    /// Most-viewed pages for a date range (defaults: last 7 days).
    pub async fn top_pages(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        limit: Option<i64>,
    ) -> Result<ReportResponse, GatewayError> {
        self.run_report(&ReportRequest {
            start_date: start_date.unwrap_or("7daysAgo").to_string(),
            end_date: end_date.unwrap_or("today").to_string(),
            metrics: vec!["screenPageViews".to_string(), "activeUsers".to_string()],
            dimensions: vec!["pagePath".to_string()],
            limit,
            order_by: vec![OrderBy {
                field_name: "screenPageViews".to_string(),
                descending: Some(true),
            }],
        })
        .await
    }
}
