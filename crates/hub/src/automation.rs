//! Keyword rules turning free-text "optimal condition" descriptors into a
//! complete actuator configuration.
//!
//! Every actuator is decided independently from one or two descriptors.
//! Matching is a case-insensitive substring test; within one actuator the
//! first matching keyword group wins and no match falls through to a fixed
//! default. Keyword groups overlap on free text ("low humidity" also
//! contains "humid"); group order settles it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actuators::{ActuatorConfig, Switch};

pub const NOT_AVAILABLE: &str = "N/A";

fn not_available() -> String {
    NOT_AVAILABLE.to_string()
}

/// Optimal growing conditions as free text, one descriptor per dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimalMetrics {
    #[serde(default = "not_available")]
    pub temperature: String,
    #[serde(default = "not_available")]
    pub humidity: String,
    #[serde(default = "not_available")]
    pub soil_moisture: String,
    #[serde(default = "not_available")]
    pub light_intensity: String,
    #[serde(default = "not_available")]
    pub soil_ph: String,
    #[serde(default = "not_available")]
    pub nutrient_level: String,
}

impl Default for OptimalMetrics {
    fn default() -> Self {
        Self {
            temperature: not_available(),
            humidity: not_available(),
            soil_moisture: not_available(),
            light_intensity: not_available(),
            soil_ph: not_available(),
            nutrient_level: not_available(),
        }
    }
}

impl OptimalMetrics {
    /// Lenient read of a model-produced object. Numbers are kept as text,
    /// anything else that is not a string becomes `N/A`.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let text = |key: &str| match obj.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => not_available(),
        };
        Self {
            temperature: text("temperature"),
            humidity: text("humidity"),
            soil_moisture: text("soilMoisture"),
            light_intensity: text("lightIntensity"),
            soil_ph: text("soilPh"),
            nutrient_level: text("nutrientLevel"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decision tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Decision {
    state: Switch,
    intensity: Option<u8>,
    note: Option<&'static str>,
}

impl Decision {
    const fn on(note: &'static str) -> Self {
        Self {
            state: Switch::On,
            intensity: None,
            note: Some(note),
        }
    }

    const fn off(note: Option<&'static str>) -> Self {
        Self {
            state: Switch::Off,
            intensity: None,
            note,
        }
    }

    const fn light(intensity: u8, note: &'static str) -> Self {
        Self {
            state: Switch::On,
            intensity: Some(intensity),
            note: Some(note),
        }
    }
}

type Arms = &'static [(&'static [&'static str], Decision)];

const SILENT_OFF: Decision = Decision::off(None);

const WATER_PUMP: Arms = &[
    (
        &["high", "wet", "moist"],
        Decision::off(Some("Water pump turned OFF (assuming moist soil).")),
    ),
    (&["low", "dry", "medium"], Decision::on("Water pump turned ON.")),
];

const GROW_LIGHT: Arms = &[
    (&["high", "full sun"], Decision::light(80, "Grow light set to ON/80%.")),
    (&["medium", "moderate"], Decision::light(50, "Grow light set to ON/50%.")),
    (&["low", "indirect"], Decision::light(20, "Grow light set to ON/20%.")),
];

const GROW_LIGHT_OFF: Decision = Decision {
    state: Switch::Off,
    intensity: Some(0),
    note: None,
};

const CO2_INJECTOR: Arms = &[(&["warm"], Decision::on("CO2 Injector ON."))];

const HEATING_PAD: Arms = &[(&["warm", "tropical"], Decision::on("Heating Pad ON."))];

const NUTRIENT_DISPENSER: Arms = &[
    (&["high", "abundant"], SILENT_OFF),
    (&["medium", "moderate"], SILENT_OFF),
    (&["low"], Decision::on("Nutrient Dispenser ON.")),
];

const MISTING_SYSTEM: Arms = &[
    (&["high", "humid"], SILENT_OFF),
    (&["low", "dry"], Decision::on("Misting System ON.")),
];

const SHADE_CONTROL: Arms = &[
    (&["low", "indirect"], Decision::on("Shades OPEN.")),
    (&["high", "full sun"], Decision::off(Some("Shades CLOSED."))),
];

fn decide(text: &str, arms: Arms, fallback: Decision) -> Decision {
    let text = text.to_lowercase();
    arms.iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map(|(_, d)| *d)
        .unwrap_or(fallback)
}

fn mentions(text: &str, keyword: &str) -> bool {
    text.to_lowercase().contains(keyword)
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationPlan {
    pub actuators: ActuatorConfig,
    /// One phrase per actuator that was explicitly driven, in actuator order.
    pub notes: Vec<&'static str>,
}

impl AutomationPlan {
    pub fn message(&self, plant_name: &str) -> String {
        let mut msg = format!("Optimal conditions for {plant_name} fetched successfully!");
        for note in &self.notes {
            msg.push(' ');
            msg.push_str(note);
        }
        msg
    }
}

/// Derive the target actuator configuration from optimal-condition text.
pub fn plan(metrics: &OptimalMetrics) -> AutomationPlan {
    let mut notes = Vec::new();
    let mut take = |d: Decision| {
        if let Some(n) = d.note {
            notes.push(n);
        }
        d
    };

    let pump = take(decide(&metrics.soil_moisture, WATER_PUMP, SILENT_OFF));
    let light = take(decide(&metrics.light_intensity, GROW_LIGHT, GROW_LIGHT_OFF));
    let co2 = take(decide(&metrics.temperature, CO2_INJECTOR, SILENT_OFF));
    let heating = take(decide(&metrics.temperature, HEATING_PAD, SILENT_OFF));
    let nutrients = take(decide(&metrics.nutrient_level, NUTRIENT_DISPENSER, SILENT_OFF));
    let misting = take(decide(&metrics.humidity, MISTING_SYSTEM, SILENT_OFF));

    let fan_off = mentions(&metrics.humidity, "low") || mentions(&metrics.temperature, "cool");
    let fan = take(if fan_off {
        SILENT_OFF
    } else {
        Decision::on("Ventilation Fan ON.")
    });

    let shade = take(decide(&metrics.light_intensity, SHADE_CONTROL, SILENT_OFF));

    let actuators = ActuatorConfig {
        water_pump: pump.state,
        grow_light_power: light.state,
        grow_light_intensity: light.intensity.unwrap_or(0),
        ventilation_fan: fan.state,
        nutrient_dispenser: nutrients.state,
        misting_system: misting.state,
        shade_control: shade.state,
        co2_injector: co2.state,
        heating_pad: heating.state,
    };

    AutomationPlan { actuators, notes }
}

// ===========================================================================
// Tests
// ===========================================================================
