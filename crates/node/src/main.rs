mod sim;

use anyhow::{Context, Result};
use std::{env, time::Duration};
use tokio::time::sleep;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sim::{PlantSim, Reading, Scenario};

const UPDATE_PATH: &str = "/api/hardware/sensor-update";

/// Day/night cycle length for the simulator. Short so a dev session sees a
/// full swing.
const DIURNAL_PERIOD_S: f64 = 600.0;

fn update_url(hub_url: &str) -> String {
    format!("{}{UPDATE_PATH}", hub_url.trim_end_matches('/'))
}

async fn post_reading(client: &reqwest::Client, url: &str, reading: &Reading) -> Result<()> {
    client
        .post(url)
        .json(reading)
        .send()
        .await
        .with_context(|| format!("hub unreachable at {url}"))?
        .error_for_status()
        .context("hub rejected reading")?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Env config
    let hub_url = env::var("HUB_URL").unwrap_or_else(|_| "http://127.0.0.1:3001".to_string());
    let sample_every_s: u64 = env::var("SAMPLE_EVERY_S")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .unwrap_or(5);
    let scenario = Scenario::from_str_lossy(&env::var("SIM_SCENARIO").unwrap_or_default());

    let url = update_url(&hub_url);
    let client = reqwest::Client::new();
    let mut sim = PlantSim::new(scenario, DIURNAL_PERIOD_S);

    info!(%url, %scenario, every_s = sample_every_s, "posting simulated readings");

    loop {
        let reading = sim.sample();

        match post_reading(&client, &url, &reading).await {
            Ok(()) => info!(
                temperature = reading.temperature,
                humidity = reading.humidity,
                soil_moisture = reading.soil_moisture,
                light = reading.light_intensity,
                ph = reading.soil_ph,
                nutrients = reading.nutrient_level,
                "reading posted"
            ),
            Err(e) => warn!("post failed: {e:#}"),
        }

        sleep(Duration::from_secs(sample_every_s)).await;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_url_joins_path() {
        assert_eq!(
            update_url("http://hub:3001"),
            "http://hub:3001/api/hardware/sensor-update"
        );
    }

    #[test]
    fn update_url_trims_trailing_slash() {
        assert_eq!(
            update_url("http://hub:3001/"),
            "http://hub:3001/api/hardware/sensor-update"
        );
    }

    #[tokio::test]
    async fn post_to_closed_port_fails_with_context() {
        let client = reqwest::Client::new();
        let reading = PlantSim::new(Scenario::Healthy, DIURNAL_PERIOD_S).sample();
        // Port 9 (discard) is not expected to be listening locally.
        let err = post_reading(&client, "http://127.0.0.1:9/api/hardware/sensor-update", &reading)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("hub unreachable"));
    }
}
