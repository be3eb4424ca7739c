use crate::error::OracleError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const INPUT_MARKER: &str = "[INPUT JSON CONTENT]";

const SYSTEM_PRIMER: &str = "The following is a conversation with an AI assistant labeled 'AI' with a user labeled 'Human'. The assistant is helpful, creative, clever, and very friendly. The assistant takes a deep breath and answers questions step by step.";
const GREETING: &str = "Human: Hello, who are you?";
const GREETING_REPLY: &str = "AI: I am an AI created by OpenAI. How can I help you today?";

/// Remote text completion asked to find the last clean semantic break in a
/// window. Calls are independent; nothing carries over between them.
#[async_trait]
pub trait BoundaryOracle: Send + Sync {
    async fn complete(&self, prompt: &str, max_output_tokens: u32, model: &str) -> Result<String, OracleError>;
}

#[derive(Serialize, Deserialize)]
struct PrechunkPayload<'a> {
    #[serde(borrow)]
    prechunk: Cow<'a, str>,
}

/// Full request text for one window: instructions, marker, then the
/// window wrapped as `{"prechunk": ...}`.
pub fn boundary_request(instructions: &str, window: &str) -> Result<String, OracleError> {
    let payload = serde_json::to_string(&PrechunkPayload { prechunk: Cow::Borrowed(window) })?;
    Ok(format!("{}\n\n{}\n\n{}", instructions, INPUT_MARKER, payload))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self { role: role.to_string(), content: content.into() }
    }
}

fn primed_messages(request: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::new("system", SYSTEM_PRIMER),
        ChatMessage::new("user", GREETING),
        ChatMessage::new("assistant", GREETING_REPLY),
        ChatMessage::new("user", format!("Human: {}", request)),
    ]
}

/// OpenAI-compatible chat completions endpoint.
pub struct OpenAiOracle {
    http: Client,
    api_base: String,
    api_key: String,
}

impl OpenAiOracle {
    pub fn new_with_timeout(api_key: String, api_base: Option<String>, timeout: Duration) -> Result<Self, OracleError> {
        if api_key.trim().is_empty() {
            return Err(OracleError::MissingApiKey);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OracleError::from_reqwest)?;
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self { http, api_base, api_key })
    }

    /// Model ids the account can use, via `GET {base}/models`.
    pub async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        #[derive(Deserialize)]
        struct ModelEntry { id: String }
        #[derive(Deserialize)]
        struct ModelList { data: Vec<ModelEntry> }

        let url = format!("{}/models", self.api_base);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(OracleError::from_reqwest)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(OracleError::from_reqwest)?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }
        let list: ModelList = serde_json::from_slice(&bytes)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

fn api_error(status: u16, body: &[u8]) -> OracleError {
    #[derive(Deserialize)]
    struct ErrBody { message: String }
    #[derive(Deserialize)]
    struct Envelope { error: ErrBody }

    let message = serde_json::from_slice::<Envelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    OracleError::Api { status, message }
}

#[async_trait]
impl BoundaryOracle for OpenAiOracle {
    async fn complete(&self, prompt: &str, max_output_tokens: u32, model: &str) -> Result<String, OracleError> {
        #[derive(Serialize)]
        struct OpenAiRequest<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            max_tokens: u32,
            temperature: f32,
            top_p: f32,
            frequency_penalty: f32,
            presence_penalty: f32,
            stream: bool,
        }

        #[derive(Deserialize)]
        struct OpenAiChoiceMessage {
            content: Option<String>,
        }

        #[derive(Deserialize)]
        struct OpenAiChoice {
            message: Option<OpenAiChoiceMessage>,
        }

        #[derive(Deserialize)]
        struct OpenAiResponse {
            choices: Vec<OpenAiChoice>,
        }

        let messages = primed_messages(prompt);
        let body = OpenAiRequest {
            model,
            messages: &messages,
            max_tokens: max_output_tokens,
            temperature: 1.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.api_base);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(OracleError::from_reqwest)?;
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(OracleError::from_reqwest)?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &bytes));
        }
        let parsed: OpenAiResponse = serde_json::from_slice(&bytes)?;
        let content = parsed
            .choices
            .into_iter()
            .find_map(|c| c.message.and_then(|m| m.content))
            .unwrap_or_default();
        debug!(model, chars = content.len(), "oracle answered");
        Ok(content)
    }
}

/// Offline oracle with deterministic answers, for `--provider mock`.
///
/// Cuts after the last paragraph break, else the last sentence end, else the
/// last whitespace, else takes the whole window. The answer is wrapped in
/// chatter so it goes through the same extraction as a real model's.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockOracle;

impl MockOracle {
    pub fn boundary(window: &str) -> &str {
        let usable = |end: usize| !window[..end].trim().is_empty();

        if let Some(i) = window.rfind("\n\n") {
            if usable(i + 2) {
                return &window[..i + 2];
            }
        }
        let sentence_end = [". ", "! ", "? ", ".\n", "!\n", "?\n"]
            .iter()
            .filter_map(|p| window.rfind(p).map(|i| i + p.len()))
            .filter(|&end| usable(end))
            .max();
        if let Some(end) = sentence_end {
            return &window[..end];
        }
        if let Some((i, c)) = window.char_indices().rev().find(|(_, c)| c.is_whitespace()) {
            let end = i + c.len_utf8();
            if usable(end) {
                return &window[..end];
            }
        }
        window
    }
}

#[async_trait]
impl BoundaryOracle for MockOracle {
    async fn complete(&self, prompt: &str, _max_output_tokens: u32, _model: &str) -> Result<String, OracleError> {
        let (_, payload) = prompt
            .rsplit_once(INPUT_MARKER)
            .ok_or_else(|| OracleError::Prompt("missing input marker".into()))?;
        let parsed: PrechunkPayload = serde_json::from_str(payload.trim())
            .map_err(|e| OracleError::Prompt(format!("bad prechunk payload: {}", e)))?;
        let cut = Self::boundary(&parsed.prechunk);
        // Extraction stops at the first '}', so keep them out of the string literal.
        let chunk = serde_json::to_string(cut)?.replace('}', "\\u007d");
        Ok(format!("AI: The last clean semantic boundary is below.\n\n{{\"chunk\": {}}}\n", chunk))
    }
}
