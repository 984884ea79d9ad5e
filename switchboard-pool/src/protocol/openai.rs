//! The chat-completions wire family, shared by OpenAI-compatible backends
//! (OpenAI itself and Groq).

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, Usage};

use super::{WireFormat, header_value_error};

/// `POST <base>/chat/completions` with Bearer auth.
pub struct OpenAiChat;

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    /// Canonical messages already match this family's schema; they pass
    /// through structurally unchanged.
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl WireFormat for OpenAiChat {
    fn endpoint(&self, base_url: &str) -> String {
        format!("{base_url}/chat/completions")
    }

    fn headers(&self, api_key: &SecretString) -> Result<HeaderMap, PoolError> {
        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", api_key.expose_secret());
        let mut value = HeaderValue::from_str(&bearer).map_err(header_value_error)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn build(&self, model: &str, request: &ChatRequest) -> Result<serde_json::Value, PoolError> {
        let body = WireRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: request.stream,
        };
        Ok(serde_json::to_value(body)?)
    }

    fn parse(&self, body: &[u8]) -> Result<ChatResponse, PoolError> {
        let wire: WireResponse = serde_json::from_slice(body)?;
        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PoolError::Decode("response contained no choices".into()))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| PoolError::Decode("first choice carried no text content".into()))?;
        Ok(ChatResponse {
            id: wire.id,
            content,
            model: wire.model,
            usage: wire.usage.unwrap_or_default(),
            provider: String::new(),
        })
    }
}
