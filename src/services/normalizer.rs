// src/services/normalizer.rs

//! Raw row to [`MeterRecord`] conversion.

use std::collections::HashSet;

use crate::models::{MeterRecord, RawMeter, SyncConfig};
use crate::services::fields::{SkipReason, derive_facility, parse_meter_rules};

/// Outcome of normalizing one page of raw rows.
#[derive(Debug, Default)]
pub struct NormalizedPage {
    pub records: Vec<MeterRecord>,
    pub skipped: Vec<(RawMeter, SkipReason)>,
}

impl NormalizedPage {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Validates raw rows and turns them into typed records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    watched: HashSet<String>,
}

impl Normalizer {
    /// Create a normalizer that logs the raw rows of the given meter numbers.
    pub fn new<I, S>(watched_meters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            watched: watched_meters.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.watched_meters.iter().cloned())
    }

    /// Normalize a single row.
    ///
    /// The object id is the store key, so a row whose id does not parse is
    /// rejected rather than defaulted.
    pub fn normalize(&self, raw: &RawMeter) -> Result<MeterRecord, SkipReason> {
        let watched = self.watched.contains(&raw.meter_number);
        if watched {
            match serde_json::to_string_pretty(raw) {
                Ok(json) => log::debug!("Watched meter {} raw row:\n{}", raw.meter_number, json),
                Err(_) => log::debug!("Watched meter {} raw row: {:?}", raw.meter_number, raw),
            }
        }

        let facility = derive_facility(raw)?;
        let rules = parse_meter_rules(&raw.meter_hours);

        let object_id = raw
            .object_id
            .trim()
            .parse::<i64>()
            .map_err(|_| SkipReason::InvalidObjectId(raw.object_id.clone()))?;

        let record = MeterRecord {
            object_id,
            meter_number: raw.meter_number.clone(),
            status: raw.status.clone(),
            pay_by_cell: raw.pay_by_cell.clone(),
            vehicle_type: rules.vehicle_type,
            duration_minutes: rules.duration_minutes,
            active_days: rules.active_days,
            active_hours: rules.active_hours,
            is_off_street_facility: facility.is_off_street,
            facility_name: facility.name,
            borough: raw.borough.clone(),
            on_street: raw.on_street.clone(),
            from_street: raw.from_street.clone(),
            to_street: raw.to_street.clone(),
            side_of_street: raw.side_of_street.clone(),
            location: raw.location.clone(),
        };

        if watched {
            log::debug!("Watched meter {} normalized: {:?}", raw.meter_number, record);
        }

        Ok(record)
    }

    /// Normalize a page, keeping the rejects aside instead of failing.
    pub fn normalize_page(&self, rows: &[RawMeter]) -> NormalizedPage {
        let mut page = NormalizedPage::default();
        for raw in rows {
            match self.normalize(raw) {
                Ok(record) => page.records.push(record),
                Err(reason) => {
                    log::warn!(
                        "Skipping meter {} (objectid {}): {}",
                        raw.meter_number,
                        raw.object_id,
                        reason
                    );
                    page.skipped.push((raw.clone(), reason));
                }
            }
        }
        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Point, VehicleType};

    fn on_street_row(object_id: &str) -> RawMeter {
        RawMeter {
            object_id: object_id.into(),
            meter_number: "3023001".into(),
            status: "Active".into(),
            pay_by_cell: "3023001".into(),
            meter_hours: "60 COMM MON-SAT 0700-1900".into(),
            facility: "On Street".into(),
            borough: "Manhattan".into(),
            on_street: "BROADWAY".into(),
            from_street: "W 34 ST".into(),
            to_street: "W 35 ST".into(),
            side_of_street: "E".into(),
            location: Some(Point::new(-73.988, 40.749)),
            ..RawMeter::default()
        }
    }

    #[test]
    fn test_normalize_on_street() {
        let record = Normalizer::default()
            .normalize(&on_street_row("42"))
            .unwrap();

        assert_eq!(record.object_id, 42);
        assert_eq!(record.meter_number, "3023001");
        assert_eq!(record.vehicle_type, VehicleType::Commercial);
        assert_eq!(record.duration_minutes, 60);
        assert!(!record.is_off_street_facility);
        assert_eq!(record.on_street, "BROADWAY");
        assert_eq!(record.location, Some(Point::new(-73.988, 40.749)));
    }

    #[test]
    fn test_normalize_rejects_bad_object_id() {
        let normalizer = Normalizer::default();
        assert_eq!(
            normalizer.normalize(&on_street_row("abc")),
            Err(SkipReason::InvalidObjectId("abc".into()))
        );
        assert_eq!(
            normalizer.normalize(&on_street_row("")),
            Err(SkipReason::InvalidObjectId(String::new()))
        );
    }

    #[test]
    fn test_normalize_rejects_missing_facility() {
        let mut row = on_street_row("1");
        row.facility = String::new();
        assert_eq!(
            Normalizer::default().normalize(&row),
            Err(SkipReason::MissingFacility)
        );
    }

    #[test]
    fn test_normalize_off_street_synthesized_name() {
        let mut row = on_street_row("7");
        row.facility = "Municipal Lot".into();
        row.from_street = "QUEENS BOULEVARD".into();
        row.on_street = "31 STREET".into();

        let record = Normalizer::default().normalize(&row).unwrap();
        assert!(record.is_off_street_facility);
        assert_eq!(record.facility_name, "Queens Boulevard-31st Street");
    }

    #[test]
    fn test_page_keeps_going_past_rejects() {
        let rows = vec![
            on_street_row("1"),
            on_street_row("not-a-number"),
            on_street_row("3"),
        ];

        let page = Normalizer::new(["3023001"]).normalize_page(&rows);
        let ids: Vec<i64> = page.records.iter().map(|r| r.object_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(page.skipped_count(), 1);
        assert_eq!(
            page.skipped[0].1,
            SkipReason::InvalidObjectId("not-a-number".into())
        );
    }

    #[test]
    fn test_from_config_watches_configured_meters() {
        let normalizer = Normalizer::from_config(&SyncConfig::default());
        assert!(normalizer.watched.contains("4863002"));
    }
}
