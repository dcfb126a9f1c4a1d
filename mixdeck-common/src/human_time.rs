//! Human-readable duration display and provider duration parsing
//!
//! Provides consistent duration formatting across mixdeck components, plus
//! the ISO-8601 duration parser used for search results from the video
//! metadata provider.

/// Format a track duration in seconds for display.
///
/// Unknown durations (0) render as `--:--`; durations of an hour or more
/// use `H:MM:SS`, everything else `M:SS`.
///
/// # Examples
///
/// ```
/// use mixdeck_common::human_time::format_duration;
///
/// assert_eq!(format_duration(0), "--:--");
/// assert_eq!(format_duration(75), "1:15");
/// assert_eq!(format_duration(3661), "1:01:01");
/// ```
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return "--:--".to_string();
    }

    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Parse an ISO-8601 duration of the `PT#H#M#S` family into seconds.
///
/// Returns 0 for anything unparseable, matching the "duration 0 = unknown"
/// convention used throughout mixdeck.
pub fn parse_iso8601_duration(iso: &str) -> u64 {
    let Some(rest) = iso.strip_prefix("PT") else {
        return 0;
    };

    let mut total: u64 = 0;
    let mut number = String::new();

    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }

        let value: u64 = match number.parse() {
            Ok(v) => v,
            Err(_) => return 0,
        };
        number.clear();

        match ch {
            'H' => total += value * 3600,
            'M' => total += value * 60,
            'S' => total += value,
            _ => return 0,
        }
    }

    // Trailing digits without a unit designator are malformed
    if !number.is_empty() {
        return 0;
    }

    total
}
