use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::actuators::{ControlError, ControlOutcome};
use crate::ai::{self, GenerateRequest, TextGenerator, UpstreamError, DESCRIPTION_UNAVAILABLE};
use crate::automation::{self, OptimalMetrics};
use crate::insights::{self, HealthInput};
use crate::sensors::LAST_WATERED;
use crate::state::SharedState;

const INDEX_HTML: &str = include_str!("ui/index.html");

const CHAT_EMPTY: &str = "Sorry, I couldn't get a response from the AI. Please try again.";
const CHAT_FAILED: &str = "Failed to get response from AI service.";
const AUTOMATION_EMPTY: &str = "Could not get full plant details from AI (empty AI response).";
const DESCRIPTION_UNPARSED: &str = "Could not parse description from AI.";
const RAW_SNIPPET_CHARS: usize = 200;

#[derive(Clone)]
pub struct AppState {
    pub shared: SharedState,
    pub ai: Arc<dyn TextGenerator>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Control(#[from] ControlError),
    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Control(ControlError::UnknownDevice(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Empty bodies read as `{}`; anything else must be JSON.
fn json_body(bytes: &Bytes) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))
}

fn required_str<'a>(body: &'a Value, key: &str, message: &str) -> Result<&'a str, ApiError> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(api_status))
        .route("/api/hardware/sensor-update", post(sensor_update))
        .route("/api/dashboard/sensor-data", get(dashboard))
        .route("/api/insights", get(health_insights))
        .route("/api/hardware/states", get(actuator_states))
        .route("/api/hardware/control/{device}", post(control))
        .route("/api/plant-automation", post(plant_automation))
        .route("/api/chat", post(chat))
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], INDEX_HTML)
}

async fn api_status(State(state): State<AppState>) -> impl IntoResponse {
    let st = state.shared.read().await;
    Json(st.to_status())
}

// -- sensors ----------------------------------------------------------------

async fn sensor_update(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(&body)?;
    let empty = Map::new();
    let update = body.as_object().unwrap_or(&empty);

    let mut st = state.shared.write().await;
    let fields = st.sensors.merge(update);
    st.record_reading(&fields);
    info!(fields = fields.len(), ignored = update.len() - fields.len(), "sensor update");

    Ok(Json(json!({
        "message": "Sensor data updated successfully",
        "data": &st.sensors,
    })))
}

async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.shared.read().await.sensors.clone();
    Json(snapshot.dashboard())
}

async fn health_insights(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.shared.read().await.sensors.backfilled();
    Json(insights::evaluate(&HealthInput::from_snapshot(&snapshot, LAST_WATERED)))
}

// -- actuators --------------------------------------------------------------

async fn actuator_states(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.shared.read().await.actuators.clone())
}

async fn control(
    State(state): State<AppState>,
    Path(device): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let body = json_body(&body)?;
    let mut st = state.shared.write().await;

    let outcome = match st.actuators.apply_command(&device, &body) {
        Ok(o) => o,
        Err(e) => {
            warn!(device = %device, error = %e, "control rejected");
            st.record_error(format!("control {device}: {e}"));
            return Err(e.into());
        }
    };

    let message = outcome.message();
    st.record_control(&outcome);
    info!(device = %device, "{message}");

    Ok(Json(match outcome {
        ControlOutcome::Intensity(v) => json!({ "message": message, "newIntensity": v }),
        ControlOutcome::Switched { state: new_state, .. } => {
            json!({ "message": message, "newState": new_state })
        }
    }))
}

// -- AI ---------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AutomationReply {
    description: String,
    optimal_metrics: OptimalMetrics,
    automation_message: String,
}

impl AutomationReply {
    fn fallback(description: &str, automation_message: String) -> Self {
        Self {
            description: description.to_string(),
            optimal_metrics: OptimalMetrics::default(),
            automation_message,
        }
    }
}

async fn plant_automation(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AutomationReply>, ApiError> {
    let body = json_body(&body)?;
    let plant = required_str(&body, "plantName", "Plant name is required.")?;
    info!(plant, "plant automation requested");

    // No lock is held while waiting on the AI service.
    let raw = match state.ai.generate(&ai::plant_profile_request(plant)).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(plant, error = %e, "plant profile request failed");
            state
                .shared
                .write()
                .await
                .record_error(format!("plant automation: {e}"));
            let message = match e {
                UpstreamError::EmptyResponse => AUTOMATION_EMPTY.to_string(),
                e => format!(
                    "Failed to get plant details or automate due to network/API error: {e}"
                ),
            };
            return Ok(Json(AutomationReply::fallback(DESCRIPTION_UNAVAILABLE, message)));
        }
    };

    let profile = match ai::parse_plant_profile(&raw) {
        Ok(p) => p,
        Err(e) => {
            warn!(plant, error = %e, "plant profile is not a JSON object");
            state
                .shared
                .write()
                .await
                .record_error(format!("plant automation: malformed reply: {e}"));
            let snippet: String = ai::strip_code_fence(&raw)
                .chars()
                .take(RAW_SNIPPET_CHARS)
                .collect();
            let message =
                format!("AI response malformed. Please try again. Raw string was: {snippet}...");
            return Ok(Json(AutomationReply::fallback(DESCRIPTION_UNPARSED, message)));
        }
    };

    let plan = automation::plan(&profile.optimal_metrics);
    let message = plan.message(plant);
    state.shared.write().await.apply_automation(plant, plan.actuators);
    info!(plant, notes = plan.notes.len(), "automation applied");

    Ok(Json(AutomationReply {
        description: profile.description,
        optimal_metrics: profile.optimal_metrics,
        automation_message: message,
    }))
}

async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = json_body(&body)?;
    let prompt = required_str(&body, "prompt", "Prompt is required")?;

    let response = match state.ai.generate(&GenerateRequest::text(prompt)).await {
        Ok(raw) => ai::chat_reply(&raw),
        Err(e) => {
            warn!(error = %e, "chat request failed");
            state.shared.write().await.record_error(format!("chat: {e}"));
            match e {
                UpstreamError::EmptyResponse => CHAT_EMPTY.to_string(),
                _ => CHAT_FAILED.to_string(),
            }
        }
    };

    Ok(Json(json!({ "response": response })))
}

// ---------------------------------------------------------------------------
// Server entry-point
// ---------------------------------------------------------------------------

pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind web port: {addr}"))?;

    info!("web ui listening on http://{addr}");

    axum::serve(listener, router(state))
        .await
        .context("web server error")
}

// ===========================================================================
// Tests
// ===========================================================================
