use std::sync::OnceLock;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, VizError};
use crate::models::Timestamp;

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a configured timezone name. `"auto"` means the system zone.
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    let name = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };
    name.parse::<Tz>()
        .map_err(|_| VizError::InvalidTimezone(name.clone()))
}

/// Offsets with a single-digit hour such as `+9:00`, as written by the CSV
/// export converter.
fn short_offset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([+-])(\d):(\d{2})$").expect("regex is valid"))
}

const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%dT%H:%M",
];

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Parses record timestamps and places them in the display timezone.
///
/// Zone-aware input keeps its instant. Naive input is read as wall-clock time
/// in `input_tz`. Either way the result is expressed in `display_tz`, which is
/// also the zone used for weekday / hour decisions downstream.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    display_tz: Tz,
    input_tz: Tz,
}

impl TimezoneHandler {
    pub fn new(display_tz: Tz, input_tz: Tz) -> Self {
        Self {
            display_tz,
            input_tz,
        }
    }

    /// Build from configured names. `input` defaults to the display zone.
    pub fn from_names(display: &str, input: Option<&str>) -> Result<Self> {
        let display_tz = resolve_timezone(display)?;
        let input_tz = match input {
            Some(name) => resolve_timezone(name)?,
            None => display_tz,
        };
        Ok(Self::new(display_tz, input_tz))
    }

    /// UTC in and out.
    pub fn utc() -> Self {
        Self::new(Tz::UTC, Tz::UTC)
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    pub fn input_tz(&self) -> Tz {
        self.input_tz
    }

    /// Parse a JSON timestamp value.
    ///
    /// Strings go through [`parse_timestamp`](Self::parse_timestamp); numbers
    /// are Unix epoch seconds. The error is a human-readable reason.
    pub fn parse_value(&self, value: &Value) -> std::result::Result<Timestamp, String> {
        match value {
            Value::String(s) => self.parse_timestamp(s),
            Value::Number(n) => {
                let utc = if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0)
                } else if let Some(f) = n.as_f64() {
                    // Floor so the nanosecond part stays non-negative before the epoch.
                    let secs = f.floor();
                    let nanos = (((f - secs) * 1_000_000_000.0) as u32).min(999_999_999);
                    DateTime::from_timestamp(secs as i64, nanos)
                } else {
                    None
                };
                utc.map(|dt: DateTime<Utc>| dt.with_timezone(&self.display_tz))
                    .ok_or_else(|| format!("epoch value {} out of range", n))
            }
            Value::Null => Err("timestamp is null".to_string()),
            other => Err(format!("expected a string or number, got {}", other)),
        }
    }

    /// Parse a timestamp string into the display zone.
    pub fn parse_timestamp(&self, s: &str) -> std::result::Result<Timestamp, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty timestamp".to_string());
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            short_offset_re().replace(s, "${1}0${2}:${3}").into_owned()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Ok(dt.with_timezone(&self.display_tz));
        }
        for fmt in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&normalised, fmt) {
                return Ok(dt.with_timezone(&self.display_tz));
            }
        }

        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return self.localize(naive);
            }
        }

        warn!("TimezoneHandler: could not parse timestamp \"{}\"", s);
        Err(format!("unrecognised timestamp \"{}\"", s))
    }

    /// Interpret a naive wall-clock time in the input zone.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant; times inside
    /// a DST gap are rejected.
    fn localize(&self, naive: NaiveDateTime) -> std::result::Result<Timestamp, String> {
        match self.input_tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&self.display_tz)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&self.display_tz)),
            LocalResult::None => Err(format!(
                "local time {} does not exist in {}",
                naive,
                self.input_tz.name()
            )),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
