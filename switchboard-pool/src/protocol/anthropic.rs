//! The structured-turn wire family (Anthropic's messages API).

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::PoolError;
use crate::types::{ChatRequest, ChatResponse, MessageContent, MessageRole, Usage};

use super::{WireFormat, header_value_error};

/// Protocol revision sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `POST <base>/messages` with `x-api-key` auth.
///
/// This family keeps system text out of the turn list and only accepts
/// plain-text content; multimodal parts routed here are a caller defect
/// and fail loudly.
pub struct AnthropicMessages;

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<WireTurn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
}

#[derive(Serialize)]
struct WireTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<WireBlock>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize, Default)]
struct WireBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl WireFormat for AnthropicMessages {
    fn endpoint(&self, base_url: &str) -> String {
        format!("{base_url}/messages")
    }

    fn headers(&self, api_key: &SecretString) -> Result<HeaderMap, PoolError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key.expose_secret()).map_err(header_value_error)?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        Ok(headers)
    }

    fn build(&self, model: &str, request: &ChatRequest) -> Result<serde_json::Value, PoolError> {
        let mut system = None;
        let mut turns = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            let text = match &message.content {
                MessageContent::Text(text) => text.as_str(),
                MessageContent::Parts(_) => {
                    return Err(PoolError::ContractViolation(
                        "multimodal content routed to a text-only wire format".into(),
                    ));
                }
            };
            if message.role == MessageRole::System {
                // the last system message wins; the turn list never carries one
                system = Some(text);
            } else {
                turns.push(WireTurn {
                    role: message.role.as_str(),
                    content: text,
                });
            }
        }

        let body = WireRequest {
            model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: turns,
            system,
        };
        Ok(serde_json::to_value(body)?)
    }

    fn parse(&self, body: &[u8]) -> Result<ChatResponse, PoolError> {
        let wire: WireResponse = serde_json::from_slice(body)?;
        let block = wire
            .content
            .into_iter()
            .next()
            .ok_or_else(|| PoolError::Decode("response contained no content blocks".into()))?;
        let content = block
            .text
            .ok_or_else(|| PoolError::Decode("first content block carried no text".into()))?;
        Ok(ChatResponse {
            id: wire.id,
            content,
            model: wire.model,
            usage: Usage::new(wire.usage.input_tokens, wire.usage.output_tokens),
            provider: String::new(),
        })
    }
}
