//! Sensor reading store: the latest value per dimension, merged from partial
//! hardware updates and back-filled with random in-range values on read.
//!
//! Back-filled values are never written back; a dimension stays unknown until
//! a hardware update supplies a parseable number for it.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use time::OffsetDateTime;

/// Descriptor reported for the last watering. No watering history is kept,
/// so this is constant.
pub const LAST_WATERED: &str = "Less than 1 Day Ago";

// ---------------------------------------------------------------------------
// Sensor dimensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorField {
    Temperature,
    Humidity,
    SoilMoisture,
    LightIntensity,
    SoilPh,
    NutrientLevel,
}

impl SensorField {
    /// Dashboard order.
    pub const ALL: [SensorField; 6] = [
        SensorField::Temperature,
        SensorField::Humidity,
        SensorField::SoilMoisture,
        SensorField::LightIntensity,
        SensorField::SoilPh,
        SensorField::NutrientLevel,
    ];

    /// JSON key used by hardware updates.
    pub fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::SoilMoisture => "soilMoisture",
            Self::LightIntensity => "lightIntensity",
            Self::SoilPh => "soilPh",
            Self::NutrientLevel => "nutrientLevel",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
            Self::SoilMoisture => "Soil Moisture",
            Self::LightIntensity => "Light Intensity",
            Self::SoilPh => "Soil pH",
            Self::NutrientLevel => "Nutrient Level",
        }
    }

    fn icon(self) -> &'static str {
        match self {
            Self::Temperature => "🌡️",
            Self::Humidity => "💧",
            Self::SoilMoisture => "🌿",
            Self::LightIntensity => "☀️",
            Self::SoilPh => "🧪",
            Self::NutrientLevel => "🔬",
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            Self::Temperature => format!("{value}°C"),
            Self::Humidity | Self::SoilMoisture => format!("{value}%"),
            Self::LightIntensity => format!("{value} Lux"),
            Self::SoilPh => format!("{value}"),
            Self::NutrientLevel => format!("{value} PPM"),
        }
    }

    /// `(min, max, decimals)` used when a reading is missing.
    fn fallback_range(self) -> (f64, f64, i32) {
        match self {
            Self::Temperature => (20.0, 28.0, 1),
            Self::Humidity => (55.0, 75.0, 0),
            Self::SoilMoisture => (45.0, 90.0, 0),
            Self::LightIntensity => (3000.0, 6000.0, 0),
            Self::SoilPh => (6.0, 7.5, 1),
            Self::NutrientLevel => (400.0, 1000.0, 0),
        }
    }

    /// Draw a placeholder reading uniformly from the fallback range.
    pub fn random_value(self) -> f64 {
        let (min, max, decimals) = self.fallback_range();
        let raw = min + fastrand::f64() * (max - min);
        let scale = 10f64.powi(decimals);
        (raw * scale).round() / scale
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Derived labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fertility {
    Optimal,
    Good,
    Fair,
    /// Never derived from moisture; only reachable as an insight engine input.
    #[allow(dead_code)]
    Low,
}

impl Fertility {
    /// Soil fertility as reported on the dashboard, derived from moisture.
    pub fn from_soil_moisture(moisture: f64) -> Self {
        if moisture > 70.0 {
            Self::Optimal
        } else if moisture > 50.0 {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

impl fmt::Display for Fertility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "Optimal",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Low => "Low",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub light_intensity: Option<f64>,
    pub soil_ph: Option<f64>,
    pub nutrient_level: Option<f64>,
}

/// One row of the dashboard sensor list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    pub name: &'static str,
    pub value: String,
    pub icon: &'static str,
}

impl SensorSnapshot {
    /// Snapshot with every dimension unknown.
    pub fn empty() -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            temperature: None,
            humidity: None,
            soil_moisture: None,
            light_intensity: None,
            soil_ph: None,
            nutrient_level: None,
        }
    }

    /// Start-of-process state: every dimension seeded with a random value.
    pub fn randomized() -> Self {
        let mut snap = Self::empty();
        for field in SensorField::ALL {
            *snap.slot_mut(field) = Some(field.random_value());
        }
        snap
    }

    pub fn get(&self, field: SensorField) -> Option<f64> {
        match field {
            SensorField::Temperature => self.temperature,
            SensorField::Humidity => self.humidity,
            SensorField::SoilMoisture => self.soil_moisture,
            SensorField::LightIntensity => self.light_intensity,
            SensorField::SoilPh => self.soil_ph,
            SensorField::NutrientLevel => self.nutrient_level,
        }
    }

    fn slot_mut(&mut self, field: SensorField) -> &mut Option<f64> {
        match field {
            SensorField::Temperature => &mut self.temperature,
            SensorField::Humidity => &mut self.humidity,
            SensorField::SoilMoisture => &mut self.soil_moisture,
            SensorField::LightIntensity => &mut self.light_intensity,
            SensorField::SoilPh => &mut self.soil_ph,
            SensorField::NutrientLevel => &mut self.nutrient_level,
        }
    }

    /// Merge a partial hardware update. Unrecognised keys are ignored; a
    /// recognised key whose value is not numeric makes that dimension
    /// unknown. The timestamp is refreshed on every call.
    ///
    /// Returns the dimensions that were touched.
    pub fn merge(&mut self, update: &Map<String, Value>) -> Vec<SensorField> {
        let mut touched = Vec::new();
        for (key, value) in update {
            if let Some(field) = SensorField::from_key(key) {
                *self.slot_mut(field) = coerce_number(value);
                touched.push(field);
            }
        }
        self.timestamp = OffsetDateTime::now_utc();
        touched
    }

    /// Copy of this snapshot with every unknown dimension filled with a
    /// random placeholder. `self` is left untouched.
    pub fn backfilled(&self) -> SensorSnapshot {
        let mut snap = self.clone();
        for field in SensorField::ALL {
            let slot = snap.slot_mut(field);
            if slot.is_none() {
                *slot = Some(field.random_value());
            }
        }
        snap
    }

    pub fn fertility(&self) -> Option<Fertility> {
        self.soil_moisture.map(Fertility::from_soil_moisture)
    }

    /// The eight dashboard rows: six sensors, fertility, last watered.
    /// Unknown dimensions are back-filled first.
    pub fn dashboard(&self) -> Vec<DisplayRecord> {
        let snap = self.backfilled();

        let mut rows: Vec<DisplayRecord> = SensorField::ALL
            .into_iter()
            .map(|field| DisplayRecord {
                name: field.label(),
                // backfilled() guarantees a value
                value: field.format(snap.get(field).unwrap_or_default()),
                icon: field.icon(),
            })
            .collect();

        let fertility = snap.fertility().unwrap_or(Fertility::Fair);
        rows.push(DisplayRecord {
            name: "Soil Fertility",
            value: fertility.to_string(),
            icon: "🌱",
        });
        rows.push(DisplayRecord {
            name: "Last Watered",
            value: LAST_WATERED.to_string(),
            icon: "🗓️",
        });
        rows
    }
}

// ---------------------------------------------------------------------------
// Value coercion
// ---------------------------------------------------------------------------

/// Coerce a JSON value to a finite number. Strings are read up to the end of
/// their leading numeric prefix, so `"23.5°C"` yields 23.5.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_float_prefix(s),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    // -- coercion -----------------------------------------------------------

    #[test]
    fn coerce_plain_numbers() {
        assert_eq!(coerce_number(&json!(23.5)), Some(23.5));
        assert_eq!(coerce_number(&json!(400)), Some(400.0));
    }

    #[test]
    fn coerce_numeric_prefix_of_strings() {
        assert_eq!(coerce_number(&json!("23.5")), Some(23.5));
        assert_eq!(coerce_number(&json!("  23.5°C")), Some(23.5));
        assert_eq!(coerce_number(&json!("4500 Lux")), Some(4500.0));
        assert_eq!(coerce_number(&json!("-3")), Some(-3.0));
        assert_eq!(coerce_number(&json!(".5")), Some(0.5));
        assert_eq!(coerce_number(&json!("1e3")), Some(1000.0));
        assert_eq!(coerce_number(&json!("7e")), Some(7.0));
    }

    #[test]
    fn coerce_rejects_non_numeric() {
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!(".")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }

    // -- random defaults ----------------------------------------------------

    #[test]
    fn random_values_stay_in_range() {
        for field in SensorField::ALL {
            let (min, max, _) = field.fallback_range();
            for _ in 0..200 {
                let v = field.random_value();
                assert!(
                    (min..=max).contains(&v),
                    "{field} value {v} outside [{min}, {max}]"
                );
            }
        }
    }

    #[test]
    fn random_values_are_rounded() {
        for _ in 0..50 {
            let h = SensorField::Humidity.random_value();
            assert_eq!(h, h.round());
            let t = SensorField::Temperature.random_value();
            assert!(((t * 10.0).round() - t * 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn randomized_snapshot_has_every_field() {
        let snap = SensorSnapshot::randomized();
        for field in SensorField::ALL {
            assert!(snap.get(field).is_some(), "{field} missing");
        }
    }

    // -- merge --------------------------------------------------------------

    #[test]
    fn merge_single_field_leaves_others() {
        let mut snap = SensorSnapshot::randomized();
        let before = snap.clone();

        let touched = snap.merge(&as_map(json!({ "temperature": 31.5 })));

        assert_eq!(touched, vec![SensorField::Temperature]);
        assert_eq!(snap.temperature, Some(31.5));
        for field in SensorField::ALL.into_iter().skip(1) {
            assert_eq!(snap.get(field), before.get(field), "{field} changed");
        }
    }

    #[test]
    fn merge_ignores_unknown_keys() {
        let mut snap = SensorSnapshot::randomized();
        let before = snap.clone();
        let touched = snap.merge(&as_map(json!({ "co2": 400, "timestamp": "x" })));
        assert!(touched.is_empty());
        for field in SensorField::ALL {
            assert_eq!(snap.get(field), before.get(field));
        }
    }

    #[test]
    fn merge_non_numeric_makes_field_unknown() {
        let mut snap = SensorSnapshot::randomized();
        snap.merge(&as_map(json!({ "humidity": "n/a" })));
        assert_eq!(snap.humidity, None);
    }

    #[test]
    fn merge_refreshes_timestamp() {
        let mut snap = SensorSnapshot::empty();
        snap.timestamp = OffsetDateTime::UNIX_EPOCH;
        snap.merge(&Map::new());
        assert!(snap.timestamp > OffsetDateTime::UNIX_EPOCH);
    }

    // -- read-side back-fill ------------------------------------------------

    #[test]
    fn backfill_does_not_persist() {
        let snap = SensorSnapshot::empty();
        let filled = snap.backfilled();
        for field in SensorField::ALL {
            assert!(filled.get(field).is_some());
            assert!(snap.get(field).is_none());
        }
    }

    #[test]
    fn backfill_keeps_known_values() {
        let mut snap = SensorSnapshot::empty();
        snap.soil_ph = Some(5.2);
        assert_eq!(snap.backfilled().soil_ph, Some(5.2));
    }

    // -- dashboard ----------------------------------------------------------

    #[test]
    fn dashboard_has_eight_rows_in_order() {
        let rows = SensorSnapshot::empty().dashboard();
        let names: Vec<&str> = rows.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "Temperature",
                "Humidity",
                "Soil Moisture",
                "Light Intensity",
                "Soil pH",
                "Nutrient Level",
                "Soil Fertility",
                "Last Watered",
            ]
        );
        assert!(rows.iter().all(|r| r.value != "N/A"));
    }

    #[test]
    fn dashboard_formats_units() {
        let mut snap = SensorSnapshot::empty();
        let update = json!({
            "temperature": 23.0,
            "humidity": 61,
            "soilMoisture": 72,
            "lightIntensity": 4200,
            "soilPh": 6.5,
            "nutrientLevel": 750,
        });
        snap.merge(&as_map(update));
        let values: Vec<String> = snap.dashboard().into_iter().map(|r| r.value).collect();
        assert_eq!(
            values,
            vec![
                "23°C",
                "61%",
                "72%",
                "4200 Lux",
                "6.5",
                "750 PPM",
                "Optimal",
                LAST_WATERED,
            ]
        );
    }

    #[test]
    fn fertility_bands() {
        assert_eq!(Fertility::from_soil_moisture(71.0), Fertility::Optimal);
        assert_eq!(Fertility::from_soil_moisture(70.0), Fertility::Good);
        assert_eq!(Fertility::from_soil_moisture(51.0), Fertility::Good);
        assert_eq!(Fertility::from_soil_moisture(50.0), Fertility::Fair);
    }

    #[test]
    fn snapshot_serializes_camel_case_with_nulls() {
        let mut snap = SensorSnapshot::empty();
        snap.soil_moisture = Some(60.0);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["soilMoisture"], 60.0);
        assert!(json["temperature"].is_null());
        assert!(json["timestamp"].is_string());
    }
}
