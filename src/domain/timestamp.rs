// Sync timestamp formatting
use chrono::{NaiveDateTime, Timelike};

/// Formats a wall-clock instant as `YYYY-MM-DDTHH:MM:SS.ffffff`.
///
/// Precision is microseconds. A zero microsecond part drops the fraction
/// entirely, so whole seconds render as `YYYY-MM-DDTHH:MM:SS`.
pub fn iso_timestamp(instant: NaiveDateTime) -> String {
    let micros = instant.nanosecond() % 1_000_000_000 / 1_000;
    let seconds = instant.format("%Y-%m-%dT%H:%M:%S");
    if micros == 0 {
        seconds.to_string()
    } else {
        format!("{}.{:06}", seconds, micros)
    }
}
