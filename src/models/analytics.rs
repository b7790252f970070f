//! Hourly analytics bins, computed aggregates and hour-key helpers.
//!
//! Hour keys are `YYYY-MM-DD-HH` in UTC. The format is fixed width and zero
//! padded, so lexicographic order equals chronological order and cutoff
//! comparisons can be done on the strings directly.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

// == Hour Keys ==
/// Length of every hour key.
pub const HOUR_KEY_LEN: usize = 13;

/// Formats the hour containing `at` as an hour key.
pub fn hour_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d-%H").to_string()
}

/// Parses an hour key back into the start of its hour.
pub fn parse_hour_key(key: &str) -> Option<DateTime<Utc>> {
    if key.len() != HOUR_KEY_LEN {
        return None;
    }
    let (date, hour) = key.rsplit_once('-')?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let hour: u32 = hour.parse().ok()?;
    let naive = date.and_hms_opt(hour, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// `hours` before `at`, or `None` once that leaves the years an hour key
/// can represent at fixed width.
fn hours_before(at: DateTime<Utc>, hours: u32) -> Option<DateTime<Utc>> {
    at.checked_sub_signed(chrono::Duration::hours(i64::from(hours)))
        .filter(|t| t.year() >= 0)
}

/// The `count` hour keys ending at the hour containing `now`, newest first.
/// Stops early at the start of the representable range.
pub fn hour_keys_back(now: DateTime<Utc>, count: u32) -> Vec<String> {
    (0..count)
        .map_while(|i| hours_before(now, i))
        .map(hour_key)
        .collect()
}

/// Oldest hour key still inside a retention window of `retention_hours`.
/// `None` when the window reaches past the representable range, in which
/// case nothing is old enough to purge.
pub fn cutoff_hour_key(now: DateTime<Utc>, retention_hours: u32) -> Option<String> {
    hours_before(now, retention_hours).map(hour_key)
}

/// True when `key` names the hour containing `now`.
pub fn is_current_hour(key: &str, now: DateTime<Utc>) -> bool {
    key == hour_key(now)
}

/// Start of the hour containing `at`.
pub fn truncate_to_hour(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

// == Epinet Bins ==
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpinetStepData {
    pub name: String,
    pub step_index: usize,
    #[serde(default)]
    pub visitors: HashSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpinetTransitionData {
    #[serde(default)]
    pub visitors: HashSet<String>,
}

/// Visitors per journey step and per step-to-step transition for one hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyEpinetBin {
    /// step node id -> visitors reaching it
    #[serde(default)]
    pub steps: HashMap<String, EpinetStepData>,
    /// from step -> to step -> visitors taking that edge
    #[serde(default)]
    pub transitions: HashMap<String, HashMap<String, EpinetTransitionData>>,
}

// == Content Bins ==
/// Per-content-item visitor and action counts for one hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyContentBin {
    #[serde(default)]
    pub unique_visitors: HashSet<String>,
    #[serde(default)]
    pub known_visitors: HashSet<String>,
    #[serde(default)]
    pub anonymous_visitors: HashSet<String>,
    pub actions: u64,
    #[serde(default)]
    pub event_counts: HashMap<String, u64>,
}

// == Site Bins ==
/// Site-wide visit counts for one hour.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlySiteBin {
    pub total_visits: u64,
    pub known_visits: u64,
    pub anonymous_visits: u64,
    pub page_views: u64,
    #[serde(default)]
    pub unique_visitors: HashSet<String>,
    #[serde(default)]
    pub event_counts: HashMap<String, u64>,
}

// == Computed Aggregates ==
/// Lead/visitor totals over rolling windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadMetrics {
    pub total_visits: u64,
    pub last_activity: Option<DateTime<Utc>>,
    pub first_time_24h: u64,
    pub returning_24h: u64,
    pub first_time_7d: u64,
    pub returning_7d: u64,
    pub first_time_28d: u64,
    pub returning_28d: u64,
    pub total_leads: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeStats {
    pub daily: u64,
    pub weekly: u64,
    pub monthly: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub x: String,
    pub y: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDataSeries {
    pub id: String,
    #[serde(default)]
    pub data: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotItem {
    pub id: String,
    pub total_events: u64,
}

/// Everything the analytics dashboard renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub stats: TimeRangeStats,
    #[serde(default)]
    pub line: Vec<LineDataSeries>,
    #[serde(default)]
    pub hot_content: Vec<HotItem>,
}
