//! Report helpers: property ids, date ranges and row shaping.

use chrono::{Days, NaiveDate};
use serde::Deserialize;
use serde_json::{Map, Value};

const PROPERTY_PREFIX: &str = "properties/";

/// Normalize `123` or `properties/123` to `properties/123`.
pub fn normalize_property_id(property_id: &str) -> String {
    let trimmed = property_id.trim();
    if trimmed.starts_with(PROPERTY_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{PROPERTY_PREFIX}{trimmed}")
    }
}

/// Resolve a date range expression to `(start, end)` as `YYYY-MM-DD`.
///
/// Accepts `7d`, `30d`, `90d` or `start,end`. Anything else means the last
/// 30 days.
pub fn parse_date_range(range: &str, today: NaiveDate) -> (String, String) {
    let days_back = match range.trim() {
        "7d" => 7,
        "30d" => 30,
        "90d" => 90,
        custom if custom.contains(',') => {
            let mut parts = custom.split(',');
            let start = parts.next().unwrap_or_default().trim().to_string();
            let end = parts.next().unwrap_or_default().trim().to_string();
            return (start, end);
        }
        _ => 30,
    };

    let start = today.checked_sub_days(Days::new(days_back)).unwrap_or(today);
    (format_date(start), format_date(today))
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// A single value cell in a report row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportValue {
    #[serde(default)]
    pub value: String,
}

/// A report row as returned by the Data API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(default)]
    pub dimension_values: Vec<ReportValue>,
    #[serde(default)]
    pub metric_values: Vec<ReportValue>,
}

/// The subset of a `runReport` / `runRealtimeReport` response we use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
}

/// Turn positional row values into objects keyed by the requested names.
pub fn format_rows(rows: &[ReportRow], dimensions: &[String], metrics: &[String]) -> Vec<Value> {
    rows.iter()
        .map(|row| {
            let mut data = Map::new();
            for (name, cell) in dimensions.iter().zip(&row.dimension_values) {
                data.insert(name.clone(), Value::String(cell.value.clone()));
            }
            for (name, cell) in metrics.iter().zip(&row.metric_values) {
                data.insert(name.clone(), Value::String(cell.value.clone()));
            }
            Value::Object(data)
        })
        .collect()
}
