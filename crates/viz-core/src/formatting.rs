use chrono::Duration;

use crate::models::Timestamp;

/// Format a floating-point number with thousands separators and a fixed number
/// of decimal places.
///
/// # Examples
///
/// ```
/// use viz_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5,  1), "1,234.5");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let negative = value < 0.0;
    let abs_value = value.abs();

    // Nudge by a relative epsilon so exact decimal midpoints round up.
    let factor = 10_f64.powi(decimals as i32);
    let epsilon = f64::EPSILON * abs_value * factor;
    let rounded = ((abs_value * factor) + epsilon).round() / factor;

    let grouped = group_thousands(&(rounded.trunc() as u64).to_string());

    let result = if decimals == 0 {
        grouped
    } else {
        let frac_str = format!("{:.prec$}", rounded.fract(), prec = decimals as usize);
        // `frac_str` is "0.xx"; keep ".xx".
        format!("{}{}", grouped, &frac_str[1..])
    };

    if negative && rounded != 0.0 {
        format!("-{}", result)
    } else {
        result
    }
}

/// Axis label for a point on the (possibly shifted) timeline: weekday and
/// wall-clock time, e.g. `"Wed 01:00"`.
pub fn format_axis_time(ts: &Timestamp) -> String {
    ts.format("%a %H:%M").to_string()
}

/// Full timestamp for listings, e.g. `"2024-01-10 01:00 JST"`.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y-%m-%d %H:%M %Z").to_string()
}

/// Human-readable span such as `"6d 23h"`, `"3h 45m"` or `"12m"`.
pub fn format_span(span: Duration) -> String {
    let total_mins = span.num_minutes().max(0);
    let days = total_mins / (24 * 60);
    let hours = (total_mins / 60) % 24;
    let mins = total_mins % 60;
    match (days, hours, mins) {
        (0, 0, m) => format!("{}m", m),
        (0, h, 0) => format!("{}h", h),
        (0, h, m) => format!("{}h {}m", h, m),
        (d, 0, _) => format!("{}d", d),
        (d, h, _) => format!("{}d {}h", d, h),
    }
}

/// Default figure title: the input identifiers joined by `" vs. "`.
pub fn default_title<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(" vs. ")
}

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let remainder = s.len() % 3;
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i != 0 && i % 3 == remainder {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
