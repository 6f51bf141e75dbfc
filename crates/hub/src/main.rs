mod actuators;
mod ai;
mod automation;
mod config;
mod insights;
mod sensors;
mod state;
mod web;

use anyhow::Result;
use std::{env, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai::{GeminiClient, TextGenerator};
use state::SystemState;
use web::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config file ─────────────────────────────────────────────────
    let config_path =
        env::var("CONFIG_PATH").unwrap_or_else(|_| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::load(&config_path)?;

    if cfg.ai.api_key.is_none() {
        warn!("no GEMINI_API_KEY configured; chat and plant automation will answer with fallbacks");
    }

    // ── Shared state ────────────────────────────────────────────────
    let shared = SystemState::shared(cfg.actuators.initial_state());
    record_startup(&mut *shared.write().await, &cfg.ai.model);
    info!(config = %config_path, model = %cfg.ai.model, "hub ready");

    // ── Web server ──────────────────────────────────────────────────
    let ai: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(&cfg.ai));
    web::serve(&cfg.server.addr(), AppState { shared, ai }).await
}

fn record_startup(st: &mut SystemState, model: &str) {
    let intensity = st.actuators.grow_light_intensity;
    st.record_system(format!("hub started (model {model}, grow light {intensity}%)"));
}
