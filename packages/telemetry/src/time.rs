//! Observation timestamp handling.
//!
//! The service reports `devTime` as `YYYY/M/D HH:MM:SS` with month and day
//! left unpadded (`2024/3/5 08:01:02`). Timestamps are local wall-clock
//! time of the tracking system and carry no offset.

use chrono::NaiveDateTime;

/// Format of a normalized `devTime`.
pub const DEV_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Zero-pads single-digit month and day components of a `devTime`.
///
/// Input not shaped like `Y/M/D time` is returned unchanged.
#[must_use]
pub fn normalize_dev_time(raw: &str) -> String {
    let parts: Vec<&str> = raw.split(' ').collect();
    let [date, time] = parts.as_slice() else {
        return raw.to_string();
    };

    let ymd: Vec<&str> = date.split('/').collect();
    let [year, month, day] = ymd.as_slice() else {
        return raw.to_string();
    };

    format!("{year}/{}/{} {time}", pad(month), pad(day))
}

/// Normalizes and parses a `devTime`. Returns `None` if it does not match
/// [`DEV_TIME_FORMAT`] after normalization.
#[must_use]
pub fn parse_dev_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&normalize_dev_time(raw), DEV_TIME_FORMAT).ok()
}

fn pad(component: &str) -> String {
    if component.len() == 1 {
        format!("0{component}")
    } else {
        component.to_string()
    }
}
