//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod retry;

use chrono::{DateTime, Utc};

use crate::models::{millis_to_datetime, Millis};

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> Millis {
    Utc::now().timestamp_millis()
}

/// Parse a time argument given as epoch milliseconds or RFC 3339
pub fn parse_time(value: &str) -> Option<Millis> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<Millis>() {
        return Some(ms);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Format epoch milliseconds as RFC 3339, falling back to the raw number
pub fn format_time(ms: Millis) -> String {
    millis_to_datetime(ms)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

/// Format a duration as `1h 02m 03s`
pub fn format_duration(ms: Millis) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let total_secs = ms.unsigned_abs() / 1000;
    let (hours, minutes, seconds) = (total_secs / 3600, (total_secs / 60) % 60, total_secs % 60);

    if hours > 0 {
        format!("{sign}{hours}h {minutes:02}m {seconds:02}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m {seconds:02}s")
    } else {
        format!("{sign}{seconds}s")
    }
}
