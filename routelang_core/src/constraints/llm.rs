//! Interpretation of a clause by an external language model
//!
//! The model is asked for a JSON object of the form
//! `{type, entities: [{kind, index}], parameters, confidence, interpretation}`. Anything that
//! does not fit that schema is an [`InterpretationError`]. Each clause gets exactly one
//! request.
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::configuration::LlmConfig;
use crate::constraints::{
    Clause, ConstraintEntity, ConstraintType, EntityKind, ParsedConstraint, ParsingMethod,
};
use crate::context::ProblemContext;

const SYSTEM_PROMPT: &str = "You translate one vehicle routing requirement into a JSON object. \
Reply with JSON only, no prose, using exactly this schema:\n\
{\"type\": one of \"node_separation\", \"node_grouping\", \"vehicle_assignment\", \
\"vehicle_count_bound\", \"route_distance_limit\", \"priority\",\n \
\"entities\": [{\"kind\": \"node\" or \"vehicle\", \"index\": integer}],\n \
\"parameters\": object,\n \"confidence\": number between 0 and 1,\n \
\"interpretation\": short mathematical description}\n\
Rules: node_separation and node_grouping take exactly two node entities. \
vehicle_assignment takes one node and one vehicle entity. \
vehicle_count_bound takes no entities and parameters min_count and/or max_count. \
route_distance_limit takes no entities and parameters max_distance and optionally unit. \
priority takes one node entity and parameter level, either \"high\" or \"low\". \
Use the indices exactly as written in the requirement.";

/// Something that can answer a chat completion request
pub trait CompletionClient: Send + Sync {
    /// Send a system and user message, returning the content of the reply
    fn complete(&self, system: &str, user: &str) -> Result<String, InterpretationError>;
}

/// Client for OpenAI compatible chat completion endpoints
pub struct HttpCompletionClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f64,
}

impl HttpCompletionClient {
    pub fn new(
        endpoint: &str,
        api_key: &str,
        model: &str,
        temperature: f64,
        timeout: Duration,
    ) -> Result<Self, InterpretationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InterpretationError::Request(e.to_string()))?;
        Ok(HttpCompletionClient {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl CompletionClient for HttpCompletionClient {
    fn complete(&self, system: &str, user: &str) -> Result<String, InterpretationError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| InterpretationError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..=299).contains(&status) {
            let body = response.text().unwrap_or_default();
            return Err(InterpretationError::Status { status, body });
        }
        let chat: ChatResponse = response
            .json()
            .map_err(|e| InterpretationError::MalformedResponse(e.to_string()))?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                InterpretationError::MalformedResponse("response has no message content".into())
            })
    }
}

/// The LLM tier
pub struct LlmInterpreter {
    client: Box<dyn CompletionClient>,
}

impl LlmInterpreter {
    /// Create an interpreter over any completion client
    pub fn new(client: Box<dyn CompletionClient>) -> Self {
        LlmInterpreter { client }
    }

    /// Create the HTTP backed interpreter
    ///
    /// Returns `None` when no credential is configured, which callers report as the tier
    /// being unavailable.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        let api_key = config.api_key.as_deref()?;
        match HttpCompletionClient::new(
            &config.endpoint,
            api_key,
            &config.model,
            config.temperature,
            config.timeout,
        ) {
            Ok(client) => Some(LlmInterpreter::new(Box::new(client))),
            Err(err) => {
                warn!(error = %err, "could not create LLM client, tier unavailable");
                None
            }
        }
    }

    /// Interpret a single clause
    pub fn interpret(
        &self,
        clause: &Clause,
        context: &ProblemContext,
    ) -> Result<ParsedConstraint, InterpretationError> {
        let user = format!(
            "Problem: {}\nRequirement: {}",
            context.describe(),
            clause.normalized
        );
        let content = self.client.complete(SYSTEM_PROMPT, &user)?;
        debug!(clause = %clause.source, reply = %content, "LLM reply");
        parse_reply(&content, clause)
    }
}

#[derive(Deserialize)]
struct ReplyPayload {
    #[serde(rename = "type")]
    constraint_type: String,
    #[serde(default)]
    entities: Vec<ReplyEntity>,
    #[serde(default)]
    parameters: IndexMap<String, Value>,
    confidence: f64,
    #[serde(default)]
    interpretation: String,
}

#[derive(Deserialize)]
struct ReplyEntity {
    kind: EntityKind,
    index: usize,
}

/// Validate a reply against the expected schema
pub fn parse_reply(content: &str, clause: &Clause) -> Result<ParsedConstraint, InterpretationError> {
    let payload: ReplyPayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| InterpretationError::MalformedResponse(e.to_string()))?;
    let constraint_type = ConstraintType::from_name(&payload.constraint_type)
        .ok_or(InterpretationError::UnknownType(payload.constraint_type))?;
    if !payload.confidence.is_finite() {
        return Err(InterpretationError::InvalidConfidence);
    }
    let entities = payload
        .entities
        .into_iter()
        .map(|e| ConstraintEntity {
            kind: e.kind,
            index: e.index,
        })
        .collect();
    let mut parsed = ParsedConstraint::new(
        constraint_type,
        entities,
        payload.confidence,
        ParsingMethod::Llm,
        &clause.source,
    )
    .with_description(payload.interpretation);
    parsed.parameters = payload.parameters;
    Ok(parsed.describe())
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Reasons an interpretation attempt failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretationError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM request error (status: {status}, body: {body})")]
    Status { status: u16, body: String },
    #[error("LLM response does not match the expected schema: {0}")]
    MalformedResponse(String),
    #[error("LLM returned unknown constraint type: {0}")]
    UnknownType(String),
    #[error("LLM returned a non-finite confidence")]
    InvalidConfidence,
}
