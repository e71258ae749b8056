//! Inference oracle transport.
//!
//! The orchestrator talks to the text-generation service only through the
//! [`ChatCompletion`] trait. [`OpenAiClient`] is the production
//! implementation: an OpenAI-compatible `/chat/completions` client built on a
//! blocking `ureq` agent with explicit timeouts, driven from a blocking task.
//!
//! ## Usage
//!
//! ```ignore
//! let client = OpenAiClient::new(OracleSettings::openai(api_key));
//! let request = ChatRequest::new("gpt-4", 0.2)
//!     .system("You are ...")
//!     .user("...");
//! let text = client.complete(&request).await?.first_content()?;
//! ```

pub mod chat;
pub mod error;
pub mod openai;

pub use chat::{ChatChoice, ChatMessage, ChatRequest, ChatResponse, ChoiceMessage, Role};
pub use error::OracleError;
pub use openai::{OpenAiClient, OracleSettings};

use async_trait::async_trait;

/// A text-generation backend.
///
/// Implementations never retry; every failure is surfaced to the caller.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, OracleError>;
}
