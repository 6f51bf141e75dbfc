//! Text generation upstream (Gemini) and helpers for cleaning its replies.
//!
//! Handlers only see the [`TextGenerator`] capability so routes can be tested
//! against a canned generator. No retry, no timeout, no caching.

use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::automation::OptimalMetrics;
use crate::config::AiConfig;

pub const DESCRIPTION_UNAVAILABLE: &str = "Description not available.";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no API key configured for the AI service")]
    MissingApiKey,
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI service returned no candidates")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// When set, the model is asked for `application/json` matching this schema.
    pub response_schema: Option<Value>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response_schema: None,
        }
    }
}

pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, UpstreamError>> + Send + 'a>>;

pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, req: &'a GenerateRequest) -> GenerateFuture<'a>;
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(cfg: &AiConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    async fn call(&self, req: &GenerateRequest) -> Result<String, UpstreamError> {
        let key = self.api_key.as_deref().ok_or(UpstreamError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        debug!(model = %self.model, prompt_len = req.prompt.len(), "calling AI service");

        // The key travels in the query string; strip the URL from errors so
        // it never reaches logs or responses.
        let body: Value = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&request_body(req))
            .send()
            .await
            .map_err(|e| e.without_url())?
            .json()
            .await
            .map_err(|e| e.without_url())?;

        first_candidate_text(&body).ok_or(UpstreamError::EmptyResponse)
    }
}

impl TextGenerator for GeminiClient {
    fn generate<'a>(&'a self, req: &'a GenerateRequest) -> GenerateFuture<'a> {
        Box::pin(self.call(req))
    }
}

fn request_body(req: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [{ "role": "user", "parts": [{ "text": req.prompt }] }],
    });
    if let Some(schema) = &req.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema,
        });
    }
    body
}

fn first_candidate_text(body: &Value) -> Option<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Reply handling
// ---------------------------------------------------------------------------

/// Drop a leading ```` ``` ```` fence line (language tag included) and a
/// trailing ```` ``` ````.
pub fn strip_code_fence(text: &str) -> &str {
    let text = match text.strip_prefix("```") {
        Some(rest) => match rest.split_once('\n') {
            Some((tag, body)) if is_fence_tag(tag) => body.trim_start(),
            _ => rest.strip_prefix("json").unwrap_or(rest).trim_start(),
        },
        None => text,
    };
    text.strip_suffix("```").map(str::trim_end).unwrap_or(text)
}

fn is_fence_tag(tag: &str) -> bool {
    tag.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

/// Chat replies: a JSON object with a non-empty `response` string yields that
/// string, anything else is returned as cleaned text.
pub fn chat_reply(raw: &str) -> String {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str::<Value>(cleaned)
        .ok()
        .and_then(|v| v.get("response").and_then(Value::as_str).map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| cleaned.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlantProfile {
    pub description: String,
    pub optimal_metrics: OptimalMetrics,
}

/// Fails when the cleaned text is not a JSON object; missing or odd fields
/// fall back to defaults.
pub fn parse_plant_profile(raw: &str) -> Result<PlantProfile, serde_json::Error> {
    let v: Map<String, Value> = serde_json::from_str(strip_code_fence(raw))?;

    let description = v
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DESCRIPTION_UNAVAILABLE)
        .to_string();
    let optimal_metrics = v
        .get("optimalMetrics")
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty())
        .map(OptimalMetrics::from_object)
        .unwrap_or_default();

    Ok(PlantProfile {
        description,
        optimal_metrics,
    })
}

pub fn plant_profile_request(plant_name: &str) -> GenerateRequest {
    let prompt = format!(
        "Provide a concise description of the {plant_name} plant (1-2 sentences). \
         Then, list its optimal growing conditions.\n\
         The output MUST be a JSON object ONLY, \
         with NO additional text or markdown formatting.\n\
         The JSON object must have two top-level keys: \
         \"description\" (string) and \"optimalMetrics\" (object).\n\
         The \"optimalMetrics\" object must have keys: \
         \"temperature\", \"humidity\", \"soilMoisture\", \
         \"lightIntensity\", \"soilPh\", and \"nutrientLevel\".\n\
         Provide values for optimalMetrics as a string \
         representing the range or a descriptive term \
         (e.g., \"20-25°C\", \"60-70%\", \"Consistently moist\", \
         \"Full sun\", \"6.0-6.5\", \"500-800 PPM\")."
    );
    GenerateRequest {
        prompt,
        response_schema: Some(plant_profile_schema()),
    }
}

fn plant_profile_schema() -> Value {
    let metric_keys = [
        "temperature",
        "humidity",
        "soilMoisture",
        "lightIntensity",
        "soilPh",
        "nutrientLevel",
    ];
    let properties: Map<String, Value> = metric_keys
        .iter()
        .map(|k| (k.to_string(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "description": { "type": "STRING" },
            "optimalMetrics": {
                "type": "OBJECT",
                "properties": properties,
                "propertyOrdering": metric_keys,
            },
        },
        "propertyOrdering": ["description", "optimalMetrics"],
    })
}

// ---------------------------------------------------------------------------
// Canned generator for route tests
// ---------------------------------------------------------------------------


// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::NOT_AVAILABLE;

    // -- fences -------------------------------------------------------------

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(strip_code_fence("```\nhello\n```"), "hello");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fence("just text"), "just text");
        assert_eq!(strip_code_fence("inline ``` fence"), "inline ``` fence");
    }

    #[test]
    fn drops_language_tag_with_fence() {
        assert_eq!(strip_code_fence("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(chat_reply("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(strip_code_fence("```json{\"a\":1}```"), "{\"a\":1}");
    }

    // -- chat ---------------------------------------------------------------

    #[test]
    fn chat_prefers_response_field() {
        assert_eq!(chat_reply(r#"{"response":"Water weekly."}"#), "Water weekly.");
        assert_eq!(
            chat_reply("```json\n{\"response\":\"Fenced.\"}\n```"),
            "Fenced."
        );
    }

    #[test]
    fn chat_falls_back_to_cleaned_text() {
        assert_eq!(chat_reply("Basil likes sun."), "Basil likes sun.");
        assert_eq!(chat_reply(r#"{"answer":"x"}"#), r#"{"answer":"x"}"#);
        assert_eq!(chat_reply(r#"{"response":""}"#), r#"{"response":""}"#);
    }

    // -- plant profile ------------------------------------------------------

    #[test]
    fn profile_parses_fenced_json() {
        let raw = "```json\n{\"description\":\"A herb.\",\"optimalMetrics\":{\
                   \"temperature\":\"20-25°C\",\"humidity\":\"40-60%\",\"soilMoisture\":\"Moist\",\
                   \"lightIntensity\":\"Full sun\",\"soilPh\":\"6.0-7.0\",\
                   \"nutrientLevel\":\"Medium\"}}\n```";
        let p = parse_plant_profile(raw).unwrap();
        assert_eq!(p.description, "A herb.");
        assert_eq!(p.optimal_metrics.light_intensity, "Full sun");
        assert_eq!(p.optimal_metrics.nutrient_level, "Medium");
    }

    #[test]
    fn profile_missing_parts_use_defaults() {
        let p = parse_plant_profile(r#"{"optimalMetrics":{}}"#).unwrap();
        assert_eq!(p.description, DESCRIPTION_UNAVAILABLE);
        assert_eq!(p.optimal_metrics, OptimalMetrics::default());

        let p = parse_plant_profile(r#"{"optimalMetrics":"warm"}"#).unwrap();
        assert_eq!(p.optimal_metrics.temperature, NOT_AVAILABLE);
    }

    #[test]
    fn profile_rejects_non_json() {
        assert!(parse_plant_profile("Basil is a herb.").is_err());
    }

    #[test]
    fn profile_rejects_json_that_is_not_an_object() {
        for raw in ["null", "42", "[]", "\"basil\"", "```json\nnull\n```"] {
            assert!(parse_plant_profile(raw).is_err(), "{raw} accepted");
        }
    }

    #[test]
    fn profile_request_carries_schema() {
        let req = plant_profile_request("Basil");
        assert!(req.prompt.contains("Basil plant"));
        let schema = req.response_schema.unwrap();
        assert_eq!(
            schema.pointer("/properties/optimalMetrics/properties/soilPh/type"),
            Some(&json!("STRING"))
        );
        assert_eq!(schema["propertyOrdering"], json!(["description", "optimalMetrics"]));
    }

    // -- wire ---------------------------------------------------------------

    #[test]
    fn request_body_plain_and_schema() {
        let plain = request_body(&GenerateRequest::text("hi"));
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");
        assert!(plain.get("generationConfig").is_none());

        let with = request_body(&plant_profile_request("Fern"));
        assert_eq!(with["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn candidate_text_extraction() {
        let ok = json!({ "candidates": [{ "content": { "parts": [{ "text": "yes" }] } }] });
        assert_eq!(first_candidate_text(&ok).as_deref(), Some("yes"));
        assert_eq!(first_candidate_text(&json!({ "candidates": [] })), None);
        assert_eq!(first_candidate_text(&json!({ "error": { "code": 400 } })), None);
    }

    #[tokio::test]
    async fn missing_key_fails_fast() {
        let client = GeminiClient::new(&AiConfig {
            api_key: None,
            ..AiConfig::default()
        });
        let err = client.generate(&GenerateRequest::text("hi")).await.unwrap_err();
        assert!(matches!(err, UpstreamError::MissingApiKey));
    }
}
