//! Parking meter data structures.
//!
//! [`RawMeter`] mirrors one row of the open data API as it arrives: every
//! field is a free-text string. [`MeterRecord`] is the typed document that
//! ends up in the store.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Deserializer, Serialize};

/// A parking meter row as returned by the open data API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawMeter {
    #[serde(rename = "objectid", default, deserialize_with = "nullable")]
    pub object_id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub meter_number: String,

    #[serde(default, deserialize_with = "nullable")]
    pub status: String,

    #[serde(rename = "pay_by_cell_number", default, deserialize_with = "nullable")]
    pub pay_by_cell: String,

    /// Encoded rules, e.g. `"60 PAS MON-FRI 0900-1900"`
    #[serde(default, deserialize_with = "nullable")]
    pub meter_hours: String,

    /// Facility classifier, `"On Street"` for curbside meters
    #[serde(default, deserialize_with = "nullable")]
    pub facility: String,

    #[serde(default, deserialize_with = "nullable")]
    pub facility_name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub borough: String,

    #[serde(default, deserialize_with = "nullable")]
    pub on_street: String,

    #[serde(default, deserialize_with = "nullable")]
    pub from_street: String,

    #[serde(default, deserialize_with = "nullable")]
    pub to_street: String,

    #[serde(default, deserialize_with = "nullable")]
    pub side_of_street: String,

    /// Absent when the row has no usable point
    #[serde(
        default,
        deserialize_with = "lenient_point",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<Point>,
}

/// Treat an explicit JSON `null` the same as a missing field.
fn nullable<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A location that is not a `{type, coordinates: [lon, lat]}` object is
/// dropped instead of failing the whole page.
fn lenient_point<'de, D>(deserializer: D) -> std::result::Result<Option<Point>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value::<Point>(v).ok())
        .filter(|point| point.coordinates.len() == 2))
}

/// GeoJSON point, coordinates ordered `[longitude, latitude]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Point {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: vec![longitude, latitude],
        }
    }
}

/// Vehicle class a meter is reserved for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum VehicleType {
    #[default]
    #[serde(rename = "PAS")]
    Passenger,
    #[serde(rename = "COMM")]
    Commercial,
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Days of the week a meter is enforced.
///
/// All flags false means the source did not say, not that the meter is
/// never active.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveDays {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl ActiveDays {
    /// Every day from Monday through `last`, inclusive.
    pub fn monday_through(last: Weekday) -> Self {
        let mut days = Self::default();
        for day in &WEEK[..=last.num_days_from_monday() as usize] {
            days.insert(*day);
        }
        days
    }

    fn flag_mut(&mut self, day: Weekday) -> &mut bool {
        match day {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    pub fn insert(&mut self, day: Weekday) {
        *self.flag_mut(day) = true;
    }

    /// Set every day that is set in `other`.
    pub fn extend(&mut self, other: ActiveDays) {
        for day in other.iter() {
            self.insert(day);
        }
    }

    pub fn contains(&self, day: Weekday) -> bool {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Active days in calendar order starting Monday.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.into_iter().filter(|day| self.contains(*day))
    }
}

/// Enforcement window within a day, without a date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveHours {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A normalized parking meter, keyed by `objectId` in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeterRecord {
    pub object_id: i64,
    pub meter_number: String,
    pub status: String,
    pub pay_by_cell: String,
    pub vehicle_type: VehicleType,
    pub duration_minutes: u32,
    pub active_days: ActiveDays,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_hours: Option<ActiveHours>,
    pub is_off_street_facility: bool,
    pub facility_name: String,
    pub borough: String,
    pub on_street: String,
    pub from_street: String,
    pub to_street: String,
    pub side_of_street: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Point>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_meter_from_api_row() {
        let json = r#"{
            "objectid": "1234",
            "meter_number": "4863002",
            "status": "Active",
            "pay_by_cell_number": "4863002",
            "meter_hours": "60 PAS MON-FRI 0900-1900",
            "facility": "On Street",
            "borough": "Brooklyn",
            "on_street": "ATLANTIC AVENUE",
            "from_street": "BOND STREET",
            "to_street": "NEVINS STREET",
            "side_of_street": "N",
            "lat": "40.68",
            "long": "-73.98",
            "location": {"type": "Point", "coordinates": [-73.98, 40.68]}
        }"#;

        let raw: RawMeter = serde_json::from_str(json).unwrap();
        assert_eq!(raw.object_id, "1234");
        assert_eq!(raw.pay_by_cell, "4863002");
        assert_eq!(raw.facility_name, "");
        assert_eq!(raw.location, Some(Point::new(-73.98, 40.68)));
    }

    #[test]
    fn raw_meter_malformed_location_is_dropped() {
        let cases = [
            r#"{"objectid": "1", "location": {"type": "Point"}}"#,
            r#"{"objectid": "1", "location": {"coordinates": [-73.98, 40.68]}}"#,
            r#"{"objectid": "1", "location": {"type": "Point", "coordinates": [-73.98]}}"#,
            r#"{"objectid": "1", "location": {"type": "Point", "coordinates": [1.0, 2.0, 3.0]}}"#,
            r#"{"objectid": "1", "location": "40.68,-73.98"}"#,
            r#"{"objectid": "1", "location": null}"#,
        ];
        for json in cases {
            let raw: RawMeter = serde_json::from_str(json).unwrap();
            assert_eq!(raw.object_id, "1");
            assert!(raw.location.is_none(), "{json}");
        }
    }

    #[test]
    fn raw_meter_null_fields_become_empty() {
        let raw: RawMeter =
            serde_json::from_str(r#"{"objectid": "1", "facility_name": null}"#).unwrap();
        assert_eq!(raw.facility_name, "");
        assert!(raw.location.is_none());
    }

    #[test]
    fn active_days_monday_through() {
        let days = ActiveDays::monday_through(Weekday::Fri);
        assert!(days.contains(Weekday::Mon));
        assert!(days.contains(Weekday::Fri));
        assert!(!days.contains(Weekday::Sat));
        assert_eq!(days.iter().count(), 5);

        assert_eq!(ActiveDays::monday_through(Weekday::Sun).iter().count(), 7);
        assert!(ActiveDays::default().is_empty());
    }

    #[test]
    fn meter_record_field_names() {
        let record = MeterRecord {
            object_id: 7,
            meter_number: "1".into(),
            status: "Active".into(),
            pay_by_cell: "1".into(),
            vehicle_type: VehicleType::Commercial,
            duration_minutes: 30,
            active_days: ActiveDays::default(),
            active_hours: None,
            is_off_street_facility: false,
            facility_name: String::new(),
            borough: "Queens".into(),
            on_street: "A".into(),
            from_street: "B".into(),
            to_street: "C".into(),
            side_of_street: "E".into(),
            location: Some(Point::new(-73.9, 40.7)),
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["objectId"], 7);
        assert_eq!(value["vehicleType"], "COMM");
        assert_eq!(value["location"]["type"], "Point");
        assert!(value.get("activeHours").is_none());
    }
}
