//! Actuator state: eight on/off switches and the grow-light intensity.
//! All writes from the control API go through [`ActuatorConfig::apply_command`],
//! which rejects unknown devices and out-of-range values.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Control name of the only non-switch field.
pub const INTENSITY_DEVICE: &str = "growLightIntensity";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    /// Exact, case-sensitive `"on"` / `"off"`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on" => Some(Self::On),
            "off" => Some(Self::Off),
            _ => None,
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_on() { "on" } else { "off" })
    }
}

// ---------------------------------------------------------------------------
// Switch devices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDevice {
    WaterPump,
    GrowLightPower,
    VentilationFan,
    NutrientDispenser,
    MistingSystem,
    ShadeControl,
    Co2Injector,
    HeatingPad,
}

impl SwitchDevice {
    pub const ALL: [SwitchDevice; 8] = [
        SwitchDevice::WaterPump,
        SwitchDevice::GrowLightPower,
        SwitchDevice::VentilationFan,
        SwitchDevice::NutrientDispenser,
        SwitchDevice::MistingSystem,
        SwitchDevice::ShadeControl,
        SwitchDevice::Co2Injector,
        SwitchDevice::HeatingPad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::WaterPump => "waterPump",
            Self::GrowLightPower => "growLightPower",
            Self::VentilationFan => "ventilationFan",
            Self::NutrientDispenser => "nutrientDispenser",
            Self::MistingSystem => "mistingSystem",
            Self::ShadeControl => "shadeControl",
            Self::Co2Injector => "co2Injector",
            Self::HeatingPad => "heatingPad",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.name() == name)
    }
}

// ---------------------------------------------------------------------------
// Errors & outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    #[error("Device '{0}' not found.")]
    UnknownDevice(String),
    #[error("Status must be \"on\" or \"off\".")]
    InvalidStatus,
    #[error("Intensity must be a number between 0 and 100.")]
    InvalidIntensity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Switched { device: SwitchDevice, state: Switch },
    Intensity(u8),
}

impl ControlOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::Switched { device, state } => {
                format!("{} status updated to {state}.", device.name())
            }
            Self::Intensity(v) => format!("Grow light intensity updated to {v}%."),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorConfig {
    pub water_pump: Switch,
    pub grow_light_power: Switch,
    pub grow_light_intensity: u8,
    pub ventilation_fan: Switch,
    pub nutrient_dispenser: Switch,
    pub misting_system: Switch,
    pub shade_control: Switch,
    pub co2_injector: Switch,
    pub heating_pad: Switch,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ActuatorConfig {
    /// Everything off, grow light preset to `grow_light_intensity`.
    pub fn new(grow_light_intensity: u8) -> Self {
        Self {
            water_pump: Switch::Off,
            grow_light_power: Switch::Off,
            grow_light_intensity: grow_light_intensity.min(100),
            ventilation_fan: Switch::Off,
            nutrient_dispenser: Switch::Off,
            misting_system: Switch::Off,
            shade_control: Switch::Off,
            co2_injector: Switch::Off,
            heating_pad: Switch::Off,
        }
    }

    pub fn switch(&self, device: SwitchDevice) -> Switch {
        match device {
            SwitchDevice::WaterPump => self.water_pump,
            SwitchDevice::GrowLightPower => self.grow_light_power,
            SwitchDevice::VentilationFan => self.ventilation_fan,
            SwitchDevice::NutrientDispenser => self.nutrient_dispenser,
            SwitchDevice::MistingSystem => self.misting_system,
            SwitchDevice::ShadeControl => self.shade_control,
            SwitchDevice::Co2Injector => self.co2_injector,
            SwitchDevice::HeatingPad => self.heating_pad,
        }
    }

    fn switch_mut(&mut self, device: SwitchDevice) -> &mut Switch {
        match device {
            SwitchDevice::WaterPump => &mut self.water_pump,
            SwitchDevice::GrowLightPower => &mut self.grow_light_power,
            SwitchDevice::VentilationFan => &mut self.ventilation_fan,
            SwitchDevice::NutrientDispenser => &mut self.nutrient_dispenser,
            SwitchDevice::MistingSystem => &mut self.misting_system,
            SwitchDevice::ShadeControl => &mut self.shade_control,
            SwitchDevice::Co2Injector => &mut self.co2_injector,
            SwitchDevice::HeatingPad => &mut self.heating_pad,
        }
    }

    /// Apply one control command. `body` is the request body: `{intensity}`
    /// for the grow-light intensity, `{status}` for every switch.
    pub fn apply_command(
        &mut self,
        device: &str,
        body: &Value,
    ) -> Result<ControlOutcome, ControlError> {
        if device == INTENSITY_DEVICE {
            let v = parse_intensity(body.get("intensity"))?;
            self.grow_light_intensity = v;
            return Ok(ControlOutcome::Intensity(v));
        }

        let device = SwitchDevice::from_name(device)
            .ok_or_else(|| ControlError::UnknownDevice(device.to_string()))?;
        let state = body
            .get("status")
            .and_then(Value::as_str)
            .and_then(Switch::parse)
            .ok_or(ControlError::InvalidStatus)?;

        *self.switch_mut(device) = state;
        Ok(ControlOutcome::Switched { device, state })
    }

    /// Switches whose state differs between `self` and `other`.
    pub fn changed_switches(&self, other: &ActuatorConfig) -> Vec<SwitchDevice> {
        SwitchDevice::ALL
            .into_iter()
            .filter(|d| self.switch(*d) != other.switch(*d))
            .collect()
    }
}

/// Intensity must be a JSON number in [0, 100]; fractions are rounded.
fn parse_intensity(value: Option<&Value>) -> Result<u8, ControlError> {
    let n = value
        .and_then(Value::as_f64)
        .ok_or(ControlError::InvalidIntensity)?;
    if !(0.0..=100.0).contains(&n) {
        return Err(ControlError::InvalidIntensity);
    }
    Ok(n.round() as u8)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- defaults -----------------------------------------------------------

    #[test]
    fn default_is_all_off_at_fifty() {
        let cfg = ActuatorConfig::default();
        assert_eq!(cfg.grow_light_intensity, 50);
        for d in SwitchDevice::ALL {
            assert_eq!(cfg.switch(d), Switch::Off, "{} not off", d.name());
        }
    }

    #[test]
    fn new_clamps_intensity() {
        assert_eq!(ActuatorConfig::new(250).grow_light_intensity, 100);
    }

    #[test]
    fn serializes_with_wire_names() {
        let json = serde_json::to_value(ActuatorConfig::default()).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 9);
        for d in SwitchDevice::ALL {
            assert_eq!(obj[d.name()], "off");
        }
        assert_eq!(obj[INTENSITY_DEVICE], 50);
    }

    // -- switches -----------------------------------------------------------

    #[test]
    fn switch_on_and_off() {
        let mut cfg = ActuatorConfig::default();
        let out = cfg
            .apply_command("waterPump", &json!({ "status": "on" }))
            .unwrap();
        assert_eq!(
            out,
            ControlOutcome::Switched {
                device: SwitchDevice::WaterPump,
                state: Switch::On
            }
        );
        assert!(cfg.water_pump.is_on());

        cfg.apply_command("waterPump", &json!({ "status": "off" }))
            .unwrap();
        assert!(!cfg.water_pump.is_on());
    }

    #[test]
    fn unknown_device_rejected() {
        let mut cfg = ActuatorConfig::default();
        let err = cfg
            .apply_command("unknownDevice", &json!({ "status": "on" }))
            .unwrap_err();
        assert_eq!(err, ControlError::UnknownDevice("unknownDevice".into()));
        assert_eq!(err.to_string(), "Device 'unknownDevice' not found.");
    }

    #[test]
    fn unknown_device_checked_before_status() {
        let mut cfg = ActuatorConfig::default();
        let err = cfg
            .apply_command("toaster", &json!({ "status": "maybe" }))
            .unwrap_err();
        assert!(matches!(err, ControlError::UnknownDevice(_)));
    }

    #[test]
    fn bad_status_rejected() {
        let mut cfg = ActuatorConfig::default();
        for body in [
            json!({ "status": "ON" }),
            json!({ "status": true }),
            json!({ "status": 1 }),
            json!({}),
        ] {
            let err = cfg.apply_command("heatingPad", &body).unwrap_err();
            assert_eq!(err, ControlError::InvalidStatus, "body {body}");
        }
        assert_eq!(cfg.heating_pad, Switch::Off);
    }

    // -- intensity ----------------------------------------------------------

    #[test]
    fn intensity_in_range_accepted() {
        let mut cfg = ActuatorConfig::default();
        let out = cfg
            .apply_command(INTENSITY_DEVICE, &json!({ "intensity": 75 }))
            .unwrap();
        assert_eq!(out, ControlOutcome::Intensity(75));
        assert_eq!(cfg.grow_light_intensity, 75);
        assert_eq!(out.message(), "Grow light intensity updated to 75%.");
    }

    #[test]
    fn intensity_boundaries_accepted() {
        let mut cfg = ActuatorConfig::default();
        cfg.apply_command(INTENSITY_DEVICE, &json!({ "intensity": 0 }))
            .unwrap();
        assert_eq!(cfg.grow_light_intensity, 0);
        cfg.apply_command(INTENSITY_DEVICE, &json!({ "intensity": 100 }))
            .unwrap();
        assert_eq!(cfg.grow_light_intensity, 100);
    }

    #[test]
    fn intensity_fraction_rounded() {
        let mut cfg = ActuatorConfig::default();
        cfg.apply_command(INTENSITY_DEVICE, &json!({ "intensity": 33.6 }))
            .unwrap();
        assert_eq!(cfg.grow_light_intensity, 34);
    }

    #[test]
    fn intensity_out_of_range_or_wrong_type_rejected() {
        let mut cfg = ActuatorConfig::default();
        for body in [
            json!({ "intensity": 150 }),
            json!({ "intensity": -1 }),
            json!({ "intensity": "50" }),
            json!({ "status": "on" }),
        ] {
            let err = cfg.apply_command(INTENSITY_DEVICE, &body).unwrap_err();
            assert_eq!(err, ControlError::InvalidIntensity, "body {body}");
        }
        assert_eq!(cfg.grow_light_intensity, 50);
    }

    #[test]
    fn switched_message() {
        let out = ControlOutcome::Switched {
            device: SwitchDevice::Co2Injector,
            state: Switch::On,
        };
        assert_eq!(out.message(), "co2Injector status updated to on.");
    }

    #[test]
    fn changed_switches_lists_differences() {
        let a = ActuatorConfig::default();
        let mut b = a.clone();
        b.misting_system = Switch::On;
        b.grow_light_intensity = 10;
        assert_eq!(a.changed_switches(&b), vec![SwitchDevice::MistingSystem]);
    }
}
