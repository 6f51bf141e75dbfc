//! Stateful plant sensor simulator for local development.
//!
//! Every dimension evolves independently:
//! - Random walk with mean reversion toward a scenario-dependent centre
//! - Per-scenario drift (drying soil, rising heat)
//! - Per-reading noise and occasional spikes
//! - Day/night swing on temperature and light
//!
//! Readings are clamped to what the physical sensor could report.

use serde::Serialize;
use std::fmt;

// ---------------------------------------------------------------------------
// Gaussian approximation
// ---------------------------------------------------------------------------

/// Irwin-Hall: sum of 12 uniform [0,1) values minus 6 approximates N(0,1).
fn std_normal() -> f64 {
    (0..12).map(|_| fastrand::f64()).sum::<f64>() - 6.0
}

fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * std_normal()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Pre-configured simulation profiles selectable via `SIM_SCENARIO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Every reading hovers inside its healthy band.
    Healthy,
    /// Soil moisture and humidity slide steadily downward.
    Drying,
    /// Hot, bright and dry air.
    Heatwave,
    /// Healthy centres with heavy noise and ~10% spikes.
    Flaky,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "drying" => Self::Drying,
            "heatwave" => Self::Heatwave,
            "flaky" => Self::Flaky,
            _ => Self::Healthy,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Drying => "drying",
            Self::Heatwave => "heatwave",
            Self::Flaky => "flaky",
        })
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Dim {
    Temperature,
    Humidity,
    SoilMoisture,
    LightIntensity,
    SoilPh,
    NutrientLevel,
}

const DIMS: [Dim; 6] = [
    Dim::Temperature,
    Dim::Humidity,
    Dim::SoilMoisture,
    Dim::LightIntensity,
    Dim::SoilPh,
    Dim::NutrientLevel,
];

/// Healthy-day behaviour of one dimension.
struct Baseline {
    center: f64,
    walk_sigma: f64,
    noise_sigma: f64,
    diurnal_amplitude: f64,
    bounds: (f64, f64),
    decimals: i32,
}

impl Dim {
    fn baseline(self) -> Baseline {
        let (center, walk_sigma, noise_sigma, diurnal_amplitude, bounds, decimals) = match self {
            Dim::Temperature => (24.0, 0.15, 0.1, 2.0, (-10.0, 50.0), 1),
            Dim::Humidity => (65.0, 0.6, 0.4, 0.0, (0.0, 100.0), 0),
            Dim::SoilMoisture => (65.0, 0.5, 0.4, 0.0, (0.0, 100.0), 0),
            Dim::LightIntensity => (4500.0, 60.0, 40.0, 1500.0, (0.0, 100_000.0), 0),
            Dim::SoilPh => (6.7, 0.01, 0.02, 0.0, (0.0, 14.0), 1),
            Dim::NutrientLevel => (700.0, 6.0, 5.0, 0.0, (0.0, 5000.0), 0),
        };
        Baseline {
            center,
            walk_sigma,
            noise_sigma,
            diurnal_amplitude,
            bounds,
            decimals,
        }
    }
}

/// Internal state for one simulated dimension.
struct Channel {
    value: f64,
    center: f64,
    drift: f64,
    walk_sigma: f64,
    noise_sigma: f64,
    spike_sigma: f64,
    diurnal_amplitude: f64,
    bounds: (f64, f64),
    decimals: i32,
}

impl Channel {
    fn new(dim: Dim, scenario: Scenario) -> Self {
        let b = dim.baseline();

        // (start, centre, drift per sample)
        let (start, center, drift) = match (scenario, dim) {
            (Scenario::Drying, Dim::SoilMoisture) => (60.0, 10.0, -0.4),
            (Scenario::Drying, Dim::Humidity) => (60.0, 35.0, -0.15),
            (Scenario::Heatwave, Dim::Temperature) => (33.0, 35.0, 0.02),
            (Scenario::Heatwave, Dim::Humidity) => (45.0, 38.0, 0.0),
            (Scenario::Heatwave, Dim::LightIntensity) => (8000.0, 9000.0, 0.0),
            (Scenario::Heatwave, Dim::SoilMoisture) => (55.0, 40.0, -0.1),
            _ => (b.center, b.center, 0.0),
        };

        let noise_scale = if scenario == Scenario::Flaky { 3.0 } else { 1.0 };
        let noise_sigma = b.noise_sigma * noise_scale;

        Self {
            value: (start + gaussian(0.0, b.walk_sigma * 2.0)).clamp(b.bounds.0, b.bounds.1),
            center,
            drift,
            walk_sigma: b.walk_sigma * noise_scale,
            noise_sigma,
            spike_sigma: noise_sigma * 20.0,
            diurnal_amplitude: b.diurnal_amplitude,
            bounds: b.bounds,
            decimals: b.decimals,
        }
    }

    fn round(&self, v: f64) -> f64 {
        let scale = 10f64.powi(self.decimals);
        (v * scale).round() / scale
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One hardware update, in the hub's wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub soil_ph: f64,
    pub nutrient_level: f64,
}

// ---------------------------------------------------------------------------
// Main simulator
// ---------------------------------------------------------------------------

pub struct PlantSim {
    channels: Vec<Channel>,
    mean_reversion: f64,
    spike_prob: f32,
    diurnal_period_s: f64,
}

impl PlantSim {
    /// `diurnal_period_s` sets the day/night cycle length. Use 600 for fast
    /// dev iteration or 86400 for real time.
    pub fn new(scenario: Scenario, diurnal_period_s: f64) -> Self {
        let spike_prob = match scenario {
            Scenario::Flaky => 0.10,
            _ => 0.005,
        };
        Self {
            channels: DIMS.iter().map(|d| Channel::new(*d, scenario)).collect(),
            mean_reversion: 0.02,
            spike_prob,
            diurnal_period_s,
        }
    }

    /// Advance every dimension one tick and return the instantaneous reading.
    pub fn sample(&mut self) -> Reading {
        let now_s = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        // Peaks a quarter period in, i.e. "midday".
        let daylight = (2.0 * std::f64::consts::PI * now_s / self.diurnal_period_s).sin();

        let mut out = [0.0; 6];
        for (slot, ch) in out.iter_mut().zip(self.channels.iter_mut()) {
            let pull = self.mean_reversion * (ch.center - ch.value);
            let walk = gaussian(0.0, ch.walk_sigma);
            ch.value = (ch.value + ch.drift + pull + walk).clamp(ch.bounds.0, ch.bounds.1);

            let noise = gaussian(0.0, ch.noise_sigma);
            let spike = if fastrand::f32() < self.spike_prob {
                gaussian(0.0, ch.spike_sigma)
            } else {
                0.0
            };
            let reading = ch.value + ch.diurnal_amplitude * daylight + noise + spike;
            *slot = ch.round(reading.clamp(ch.bounds.0, ch.bounds.1));
        }

        let [temperature, humidity, soil_moisture, light_intensity, soil_ph, nutrient_level] = out;
        Reading {
            temperature,
            humidity,
            soil_moisture,
            light_intensity,
            soil_ph,
            nutrient_level,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
