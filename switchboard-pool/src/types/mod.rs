//! Canonical chat types shared by every provider.

pub mod message;
pub mod request;
pub mod response;

pub use message::{ChatMessage, ContentPart, ImageRef, MessageContent, MessageRole};
pub use request::ChatRequest;
pub use response::{ChatResponse, Usage};
