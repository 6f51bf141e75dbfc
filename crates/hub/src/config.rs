//! TOML config loading and validation. A missing file means built-in
//! defaults; `WEB_PORT` and `GEMINI_API_KEY` override the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::net::IpAddr;

use crate::actuators::ActuatorConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub actuators: ActuatorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 3001,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-2.0-flash".into(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ActuatorsConfig {
    /// Grow-light intensity at startup, percent.
    pub grow_light_intensity: i64,
}

impl Default for ActuatorsConfig {
    fn default() -> Self {
        Self {
            grow_light_intensity: 50,
        }
    }
}

impl ActuatorsConfig {
    /// Startup actuator state. Call after validation.
    pub fn initial_state(&self) -> ActuatorConfig {
        ActuatorConfig::new(self.grow_light_intensity.clamp(0, 100) as u8)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate every section. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_server(&mut errors);
        self.validate_ai(&mut errors);

        let intensity = self.actuators.grow_light_intensity;
        if !(0..=100).contains(&intensity) {
            errors.push(format!(
                "actuators: grow_light_intensity {intensity} out of range [0, 100]"
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_server(&self, errors: &mut Vec<String>) {
        let s = &self.server;
        if s.bind.trim().is_empty() {
            errors.push("server: bind is empty".into());
        } else if s.bind.parse::<IpAddr>().is_err() {
            errors.push(format!("server: bind '{}' is not an IP address", s.bind));
        }
        if s.port == 0 {
            errors.push("server: port must be non-zero".into());
        }
    }

    fn validate_ai(&self, errors: &mut Vec<String>) {
        let ai = &self.ai;
        if !(ai.endpoint.starts_with("http://") || ai.endpoint.starts_with("https://")) {
            errors.push(format!(
                "ai: endpoint '{}' must start with http:// or https://",
                ai.endpoint
            ));
        }
        if ai.model.trim().is_empty() {
            errors.push("ai: model is empty".into());
        } else if ai.model.contains('/') {
            errors.push(format!("ai: model '{}' must not contain '/'", ai.model));
        }
    }

    /// Environment overrides. `var` looks a variable up by name.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = var("WEB_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("WEB_PORT '{port}' is not a valid port"))?;
        }
        if let Some(key) = var("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
            self.ai.api_key = Some(key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, override from the environment, and validate.
pub fn load(path: &str) -> Result<Config> {
    load_with_env(path, |k| std::env::var(k).ok())
}

fn load_with_env(path: &str, var: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => {
            toml::from_str(&contents).with_context(|| format!("failed to parse config: {path}"))?
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path, "no config file, using defaults");
            Config::default()
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read config: {path}")),
    };

    config.apply_env(var)?;
    config
        .validate()
        .with_context(|| format!("invalid config: {path}"))?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
