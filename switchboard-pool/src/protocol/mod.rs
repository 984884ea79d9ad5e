//! Wire-format translation between the canonical schema and each backend
//! protocol family.

pub mod anthropic;
pub mod openai;

use reqwest::header::HeaderMap;
use secrecy::SecretString;

use crate::error::PoolError;
use crate::provider::ProviderKind;
use crate::types::{ChatRequest, ChatResponse};

/// One backend wire protocol: endpoint, auth headers, request body
/// construction, response parsing.
///
/// Implementations are stateless. The provider contributes identity
/// (base URL, credential, model) and the canonical request contributes
/// content; neither side leaks into the other.
pub trait WireFormat: Send + Sync {
    /// Full URL for a chat call against `base_url`.
    fn endpoint(&self, base_url: &str) -> String;

    /// Auth and protocol-version headers for a call.
    fn headers(&self, api_key: &SecretString) -> Result<HeaderMap, PoolError>;

    /// Translate a canonical request into the wire body. `model` arrives
    /// already resolved (request override or provider default).
    fn build(&self, model: &str, request: &ChatRequest) -> Result<serde_json::Value, PoolError>;

    /// Parse a 200-status wire body back into canonical form. The
    /// `provider` field of the result is left empty for the dispatcher
    /// to stamp.
    fn parse(&self, body: &[u8]) -> Result<ChatResponse, PoolError>;
}

/// The wire format for a provider kind.
///
/// The match is exhaustive on purpose: a new kind cannot compile until it
/// names its family, so nothing ever defaults silently.
pub fn for_kind(kind: ProviderKind) -> &'static dyn WireFormat {
    match kind {
        ProviderKind::Groq | ProviderKind::OpenAi => &openai::OpenAiChat,
        ProviderKind::Anthropic => &anthropic::AnthropicMessages,
    }
}

pub(crate) fn header_value_error(err: reqwest::header::InvalidHeaderValue) -> PoolError {
    PoolError::Configuration(format!("credential is not usable in a header: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_maps_to_its_family() {
        let groq = for_kind(ProviderKind::Groq);
        let openai = for_kind(ProviderKind::OpenAi);
        let anthropic = for_kind(ProviderKind::Anthropic);

        assert_eq!(groq.endpoint("http://x"), "http://x/chat/completions");
        assert_eq!(openai.endpoint("http://x"), "http://x/chat/completions");
        assert_eq!(anthropic.endpoint("http://x"), "http://x/messages");
    }
}
