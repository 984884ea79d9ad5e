//! switchboard-pool
//!
//! A priority-ordered pool of interchangeable LLM backends behind one
//! canonical chat shape. The pool owns provider registration and ordering,
//! per-provider fixed-window rate limiting, translation between the
//! canonical schema and each backend's wire schema, and the failover loop
//! that walks providers until one answers.
//!
//! ```ignore
//! let pool = ProviderPool::new()?;
//! pool.add_provider(config);
//! let response = pool.chat(&ChatRequest::builder().user("hi").build()).await?;
//! ```
#![deny(unsafe_code)]

pub mod error;
pub mod limiter;
pub mod pool;
pub mod protocol;
pub mod provider;
pub mod registry;
pub mod types;

pub use error::PoolError;
pub use limiter::RateLimiter;
pub use pool::ProviderPool;
pub use provider::{Provider, ProviderConfig, ProviderKind, ProviderStats};
pub use registry::ProviderRegistry;
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageRef, MessageContent, MessageRole,
    Usage,
};
