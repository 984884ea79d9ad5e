//! Canonical response shape and token accounting.

use serde::{Deserialize, Serialize};

/// Token usage for one call.
///
/// Chat-completions backends report this triple verbatim; structured-turn
/// backends report input/output counts that the translator sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Build a usage triple, deriving the total.
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A canonical chat response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Normalized text of the first choice or content block.
    pub content: String,
    /// Model name as resolved by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Usage,
    /// Name of the provider that produced this response.
    #[serde(default)]
    pub provider: String,
}
