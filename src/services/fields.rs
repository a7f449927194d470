// src/services/fields.rs

//! Parsers for the free-text fields of a raw meter row.
//!
//! Nothing in here fails: unreadable input degrades to defaults, and
//! incomplete facility data is reported as a [`SkipReason`].

use std::ops::Range;

use chrono::{NaiveTime, Weekday};
use thiserror::Error;

use crate::models::{ActiveDays, ActiveHours, RawMeter, VehicleType};

/// Why a raw row was left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("missing facility data")]
    MissingFacility,

    #[error("on-street meter without complete street information")]
    MissingStreetInfo,

    #[error("off-street meter without facility name or usable street names")]
    UnnamedFacility,

    #[error("objectid '{0}' is not an integer")]
    InvalidObjectId(String),
}

/// Structured view of the `meter_hours` encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeterRules {
    pub duration_minutes: u32,
    pub vehicle_type: VehicleType,
    pub active_days: ActiveDays,
    pub active_hours: Option<ActiveHours>,
}

/// Parse a `meter_hours` string such as `"60 PAS MON-FRI 0900-1900"`.
///
/// Tokens are whitespace separated and may come in any order, except that
/// the duration is always read from the first token. When several vehicle
/// or time-range tokens are present the last one wins.
pub fn parse_meter_rules(raw: &str) -> MeterRules {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut rules = MeterRules {
        duration_minutes: tokens
            .first()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0),
        ..MeterRules::default()
    };

    for token in &tokens {
        match token.to_ascii_uppercase().as_str() {
            "PAS" => rules.vehicle_type = VehicleType::Passenger,
            "COM" | "COMM" => rules.vehicle_type = VehicleType::Commercial,
            "MON-FRI" => rules
                .active_days
                .extend(ActiveDays::monday_through(Weekday::Fri)),
            "MON-SAT" => rules
                .active_days
                .extend(ActiveDays::monday_through(Weekday::Sat)),
            "MON-SUN" => rules
                .active_days
                .extend(ActiveDays::monday_through(Weekday::Sun)),
            _ => {
                if let Some(hours) = parse_time_range(token) {
                    rules.active_hours = Some(hours);
                }
            }
        }
    }

    rules
}

/// `HHMM-HHMM`: nine characters with a dash between two four-digit halves.
fn parse_time_range(token: &str) -> Option<ActiveHours> {
    if token.len() != 9 {
        return None;
    }
    let (start, end) = token.split_once('-')?;
    if start.len() != 4 || end.len() != 4 || end.contains('-') {
        return None;
    }
    Some(ActiveHours {
        start_time: parse_clock(start),
        end_time: parse_clock(end),
    })
}

/// Digits that fail to parse count as zero; out-of-range values wrap
/// around the day.
fn parse_clock(hhmm: &str) -> NaiveTime {
    let hour = leading_number(hhmm, 0..2);
    let minute = leading_number(hhmm, 2..4);
    let seconds = (hour * 3600 + minute * 60) % 86_400;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default()
}

fn leading_number(s: &str, range: Range<usize>) -> u32 {
    s.get(range).and_then(|d| d.parse().ok()).unwrap_or(0)
}

/// Facility classification of a meter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facility {
    pub is_off_street: bool,
    pub name: String,
}

/// Classify a row as on-street or off-street and settle its facility name.
///
/// On-street meters need all four street descriptors. Off-street meters
/// need a facility name; when the source has none, one is synthesized from
/// the cross streets.
pub fn derive_facility(raw: &RawMeter) -> Result<Facility, SkipReason> {
    let classifier = raw.facility.trim();
    if classifier.is_empty() {
        return Err(SkipReason::MissingFacility);
    }

    let is_off_street = !classifier.to_ascii_uppercase().contains("ON STREET");

    if !is_off_street {
        let streets = [
            &raw.on_street,
            &raw.from_street,
            &raw.to_street,
            &raw.side_of_street,
        ];
        if streets.iter().any(|s| is_blank(s)) {
            return Err(SkipReason::MissingStreetInfo);
        }
        return Ok(Facility {
            is_off_street,
            name: raw.facility_name.clone(),
        });
    }

    if !is_blank(&raw.facility_name) {
        return Ok(Facility {
            is_off_street,
            name: raw.facility_name.clone(),
        });
    }

    synthesize_facility_name(&raw.from_street, &raw.on_street)
        .map(|name| Facility {
            is_off_street,
            name,
        })
        .ok_or(SkipReason::UnnamedFacility)
}

/// Build `"<From Street>-<On Street>"`, e.g. `"Bond Street-31st Street"`.
fn synthesize_facility_name(from_street: &str, on_street: &str) -> Option<String> {
    if !is_usable_street(from_street) || !is_usable_street(on_street) {
        return None;
    }
    let from = title_case(from_street.trim());
    let on = with_ordinal_number(&title_case(on_street.trim()));
    Some(format!("{from}-{on}"))
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Placeholder values the dataset uses for unknown streets.
fn is_usable_street(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && !s.eq_ignore_ascii_case("null") && !s.eq_ignore_ascii_case("n/a")
}

/// Lowercase everything, then capitalize the first letter of each word.
///
/// Digits and underscores join words, everything else separates them, so
/// `"31ST STREET"` becomes `"31st Street"` and `"O'BRIEN"` becomes `"O'Brien"`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut word_start = true;
    for c in s.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// Rewrite `"31 Street"` as `"31st Street"`. Anything else is returned as is.
fn with_ordinal_number(street: &str) -> String {
    let Some((number, rest)) = street.split_once(' ') else {
        return street.to_string();
    };
    if rest.split(' ').next() != Some("Street") {
        return street.to_string();
    }
    match number.parse::<u64>() {
        Ok(n) => format!("{n}{} {rest}", ordinal_suffix(n)),
        Err(_) => street.to_string(),
    }
}

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st.
pub fn ordinal_suffix(n: u64) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
