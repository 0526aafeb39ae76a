//! Quiet-hours window arithmetic.
//!
//! Works on `"HH:mm"` strings and a weekday set so the evaluation is pure;
//! the preference resolver converts the current instant into the user's
//! configured timezone before calling in here. A window whose start is later
//! than its end spans midnight (e.g. 22:00–07:00).

use chrono::Weekday;

/// Parse an `"HH:mm"` string into minutes since midnight.
///
/// Returns `None` for anything that is not a valid 24-hour time.
pub fn minutes_of_day(hhmm: &str) -> Option<u32> {
    let (h, m) = hhmm.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Whether `now` falls inside the `[start, end)` window.
///
/// All three values are minutes since midnight. When `start > end` the
/// window wraps around midnight and covers `[start, 24h) ∪ [0, end)`.
/// A degenerate window where `start == end` matches nothing.
pub fn window_contains(start: u32, end: u32, now: u32) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        now >= start && now < end
    } else {
        now >= start || now < end
    }
}

/// Whether the quiet-hours window is active for the given local time.
///
/// `weekdays` uses chrono's numbering via [`Weekday::num_days_from_monday`]
/// (0 = Monday). An empty weekday list means the window applies every day.
/// Unparseable start/end strings disable the window entirely.
pub fn is_active(
    start: &str,
    end: &str,
    weekdays: &[u8],
    local_weekday: Weekday,
    local_minutes: u32,
) -> bool {
    if !weekdays.is_empty() {
        let day = local_weekday.num_days_from_monday() as u8;
        if !weekdays.contains(&day) {
            return false;
        }
    }

    match (minutes_of_day(start), minutes_of_day(end)) {
        (Some(s), Some(e)) => window_contains(s, e, local_minutes),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
