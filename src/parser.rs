//! Parser client: the external LLM boundary.
//!
//! The parser turns an utterance into a structured interpretation. It is
//! treated as untrusted: any field may be absent or of the wrong type,
//! unknown event types are dropped with a diagnostic, and the raw reply
//! text is recovered through a 3-tier scrubbing strategy before schema
//! validation. Validation happens once, here; everything downstream
//! operates on typed values.
//!
//! Parser failures never fail a command: the orchestrator records them as
//! diagnostics and the classifier proceeds on keyword evidence alone.

use crate::catalog::{EventCatalog, EventType};
use crate::config::ParserConfig;
use crate::error::{CommandError, CoreResult};
use crate::fields::{ExtractedData, FieldValue};
use crate::logging::{log_debug, log_warn};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Parser output
// ============================================================================

/// Sanitized parser interpretation of one utterance.
///
/// Built from untrusted JSON by [`ParserOutput::from_json`]; every field is
/// optional and `diagnostics` records what sanitation dropped.
#[derive(Debug, Clone, Default)]
pub struct ParserOutput {
    /// Module hint, as the parser named it.
    pub module: Option<String>,
    /// Action hint (e.g. "record", "query").
    pub action: Option<String>,
    /// Proposed event types that exist in the catalog, in parser order.
    pub proposed_event_types: Vec<EventType>,
    /// The parser's pick for the primary event.
    pub primary_event: Option<EventType>,
    /// Field values the parser extracted.
    pub extracted_data: ExtractedData,
    /// Parser self-reported confidence, clamped to [0, 1].
    pub confidence: Option<f64>,
    /// Sanitation notes: dropped unknown event types, discarded values.
    pub diagnostics: Vec<String>,
}

impl ParserOutput {
    /// Validate untrusted parser JSON against the catalog.
    ///
    /// Tolerant per field: wrong-typed or unknown entries are dropped with
    /// a diagnostic.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ParserMalformed`] only when the payload is
    /// not a JSON object at all.
    pub fn from_json(value: &serde_json::Value, catalog: &EventCatalog) -> CoreResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| CommandError::parser_malformed("interpretation is not a JSON object"))?;

        let mut output = Self {
            module: object.get("module").and_then(|v| v.as_str()).map(String::from),
            action: object.get("action").and_then(|v| v.as_str()).map(String::from),
            ..Self::default()
        };

        if let Some(proposed) = object.get("proposed_event_types") {
            match proposed.as_array() {
                Some(entries) => {
                    for entry in entries {
                        let Some(name) = entry.as_str() else {
                            output
                                .diagnostics
                                .push(format!("parser proposed non-string event type: {entry}"));
                            continue;
                        };
                        match EventType::from_name(name).filter(|t| catalog.contains(*t)) {
                            Some(event_type) => {
                                if !output.proposed_event_types.contains(&event_type) {
                                    output.proposed_event_types.push(event_type);
                                }
                            }
                            None => output
                                .diagnostics
                                .push(format!("parser proposed unknown event type: {name}")),
                        }
                    }
                }
                None => output
                    .diagnostics
                    .push("parser proposed_event_types is not an array".to_string()),
            }
        }

        if let Some(primary) = object.get("primary_event").and_then(|v| v.as_str()) {
            match EventType::from_name(primary).filter(|t| catalog.contains(*t)) {
                Some(event_type) => output.primary_event = Some(event_type),
                None => output
                    .diagnostics
                    .push(format!("parser primary_event is unknown: {primary}")),
            }
        }

        if let Some(data) = object.get("extracted_data") {
            match data.as_object() {
                Some(entries) => {
                    for (key, raw) in entries {
                        match FieldValue::from_json(raw) {
                            Some(value) => {
                                output.extracted_data.insert(key.clone(), value);
                            }
                            None => output.diagnostics.push(format!(
                                "parser value for '{key}' is not representable: {raw}"
                            )),
                        }
                    }
                }
                None => output
                    .diagnostics
                    .push("parser extracted_data is not an object".to_string()),
            }
        }

        if let Some(confidence) = object.get("confidence") {
            match confidence.as_f64() {
                Some(c) => output.confidence = Some(c.clamp(0.0, 1.0)),
                None => output
                    .diagnostics
                    .push(format!("parser confidence is not a number: {confidence}")),
            }
        }

        Ok(output)
    }
}

// ============================================================================
// Client contract
// ============================================================================

/// The parser boundary: one operation, deadline-bound and cancellable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ParserClient: Send + Sync {
    /// Interpret an utterance within `deadline`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::ParserTimeout`] when the deadline expires
    /// - [`CommandError::ParserUnavailable`] on transport or upstream failure
    /// - [`CommandError::ParserMalformed`] when the reply is unrecoverable
    /// - [`CommandError::Cancelled`] when the caller cancels; the in-flight
    ///   call is abandoned and its result discarded on arrival
    async fn interpret(
        &self,
        utterance: &str,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<ParserOutput>;
}

// ============================================================================
// Reply scrubbing
// ============================================================================

/// Recovers structured JSON from raw model output with a 3-tier strategy:
///
/// 1. direct JSON parse
/// 2. strip known artifacts (code fences, channel markers) and retry
/// 3. extract a balanced JSON object from mixed content
pub struct OutputScrubber;

impl OutputScrubber {
    /// Parse model output into a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ParserMalformed`] when no valid JSON object
    /// can be recovered.
    pub fn scrub(raw: &str) -> CoreResult<serde_json::Value> {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) {
            return Self::require_object(parsed);
        }

        let cleaned = Self::strip_artifacts(raw);
        if cleaned != raw {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&cleaned) {
                return Self::require_object(parsed);
            }
        }

        if let Some(candidate) = Self::extract_object(&cleaned) {
            if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&candidate) {
                return Self::require_object(parsed);
            }
        }

        let preview: String = raw.chars().take(200).collect();
        Err(CommandError::parser_malformed(format!(
            "could not recover JSON from parser reply: {preview}{}",
            if raw.len() > 200 { "..." } else { "" }
        )))
    }

    fn require_object(value: serde_json::Value) -> CoreResult<serde_json::Value> {
        match value.as_object() {
            Some(obj) if !obj.is_empty() => Ok(value),
            Some(_) => Err(CommandError::parser_malformed(
                "parser reply is an empty object",
            )),
            None => Err(CommandError::parser_malformed(
                "parser reply is not a JSON object",
            )),
        }
    }

    fn strip_artifacts(content: &str) -> String {
        let cleaned = content
            .replace("```json", "")
            .replace("```JSON", "")
            .replace("```", "")
            .replace("<|channel|>", "")
            .replace("<|start|>", "")
            .replace("<|end|>", "");

        cleaned
            .trim()
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect()
    }

    /// Extract the first balanced `{...}` from mixed content, honoring
    /// string literals and escapes.
    fn extract_object(content: &str) -> Option<String> {
        let start = content.find('{')?;
        let tail = &content[start..];

        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;

        for (idx, ch) in tail.char_indices() {
            match ch {
                '"' if !escaped => in_string = !in_string,
                '\\' if in_string && !escaped => {
                    escaped = true;
                    continue;
                }
                '{' if !in_string => depth += 1,
                '}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(tail[..=idx].to_string());
                    }
                }
                _ => {}
            }
            escaped = false;
        }

        None
    }
}

// ============================================================================
// HTTP client
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Parser client backed by an OpenAI-compatible chat-completions endpoint.
///
/// The instruction prompt pins the reply to the interpretation schema and
/// enumerates the catalog's event types; the reply content is recovered
/// through [`OutputScrubber`] before validation.
pub struct HttpParserClient {
    http: reqwest::Client,
    config: ParserConfig,
    catalog: Arc<EventCatalog>,
    instructions: String,
}

impl HttpParserClient {
    /// Create a new HTTP parser client.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Configuration`] if the base URL is empty or
    /// the HTTP client cannot be built.
    pub fn new(config: ParserConfig, catalog: Arc<EventCatalog>) -> CoreResult<Self> {
        if config.base_url.is_empty() {
            return Err(CommandError::configuration("parser base URL is required"));
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| CommandError::configuration(format!("parser HTTP client: {e}")))?;

        let instructions = Self::build_instructions(&catalog);

        log_debug!(
            base_url = %config.base_url,
            model = %config.model,
            timeout_ms = config.timeout_ms,
            "HTTP parser client initialized"
        );

        Ok(Self {
            http,
            config,
            catalog,
            instructions,
        })
    }

    fn build_instructions(catalog: &EventCatalog) -> String {
        let event_names: Vec<&str> = catalog
            .descriptors()
            .iter()
            .map(|d| d.event_type.name())
            .collect();

        format!(
            "You interpret life-management commands. Reply with one JSON object and \
             nothing else: {{\"module\": string?, \"action\": string?, \
             \"proposed_event_types\": [string]?, \"primary_event\": string?, \
             \"extracted_data\": object?, \"confidence\": number?}}. \
             Event types must come from: {}.",
            event_names.join(", ")
        )
    }

    async fn send_request(&self, utterance: &str) -> CoreResult<ParserOutput> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": self.instructions},
                {"role": "user", "content": utterance},
            ],
            "temperature": 0.0,
            "stream": false,
        });

        let mut request = self.http.post(&url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CommandError::parser_unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CommandError::parser_unavailable(format!(
                "parser endpoint answered {status}"
            )));
        }

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|e| CommandError::parser_malformed(format!("reply body: {e}")))?;

        let content = reply
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(CommandError::parser_malformed("parser reply has no content"));
        }

        let scrubbed = OutputScrubber::scrub(content)?;
        ParserOutput::from_json(&scrubbed, &self.catalog)
    }
}

#[async_trait]
impl ParserClient for HttpParserClient {
    async fn interpret(
        &self,
        utterance: &str,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<ParserOutput> {
        log_debug!(
            utterance_len = utterance.len(),
            deadline_ms = deadline.as_millis(),
            "Interpreting utterance"
        );

        tokio::select! {
            _ = cancel.cancelled() => Err(CommandError::cancelled()),
            outcome = tokio::time::timeout(deadline, self.send_request(utterance)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        log_warn!(
                            deadline_ms = deadline.as_millis(),
                            "Parser call exceeded its deadline"
                        );
                        Err(CommandError::parser_timeout(deadline.as_millis() as u64))
                    }
                }
            }
        }
    }
}
