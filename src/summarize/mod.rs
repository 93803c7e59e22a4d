pub mod chunk;
pub mod driver;
pub mod openai;
pub mod tokens;

pub use chunk::{split_into_chunks, TranscriptChunk};
pub use driver::{SummaryDriver, SummaryOutcome};
pub use openai::ChatClient;
pub use tokens::TokenEstimator;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// One generation result: text plus the backend's reported token usage.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub total_tokens: u64,
}

/// Text-generation capability. Zero candidates from the backend is an
/// error, never an empty completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[Message]) -> Result<Completion>;
    fn name(&self) -> &'static str;
    /// Model identifier used in artifact file names.
    fn engine(&self) -> &str;
}
