use crate::error::{Result, ScribeError};
use crate::summarize::{Completion, Message, TextGenerator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// OpenAI API base; tests point this at a mock server.
const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Maximum retries for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// OpenAI chat-completions client.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl ChatClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "gpt-3.5-turbo".to_string(),
            api_base: OPENAI_API_BASE.to_string(),
        }
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL (mock servers in tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    async fn call_api(&self, messages: &[Message]) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        debug!("Chat API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            let parsed: ChatResponse = serde_json::from_str(&body)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(ScribeError::Api(format!(
                "Chat API error ({}): {} ({})",
                status, api_error.error.message, api_error.error.r#type
            )));
        }

        Err(ScribeError::Api(format!(
            "Chat API error ({}): {}",
            status, error_body
        )))
    }

    async fn generate_with_retry(&self, messages: &[Message]) -> Result<ChatResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.call_api(messages).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    // Don't retry on client errors
                    let error_str = e.to_string();
                    if error_str.contains("API error (4") {
                        return Err(e);
                    }
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ScribeError::Api("Unknown error".to_string())))
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(&self, messages: &[Message]) -> Result<Completion> {
        let response = self.generate_with_retry(messages).await?;

        // An empty choice list is an exceptional result, not an empty
        // completion.
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ScribeError::Generation(format!(
                "No choices returned from chat API using model '{}'",
                self.model
            ))
        })?;

        Ok(Completion {
            text: choice.message.content.trim().to_string(),
            total_tokens: response.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }

    fn name(&self) -> &'static str {
        "OpenAI Chat"
    }

    fn engine(&self) -> &str {
        &self.model
    }
}

// API request/response types

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_override() {
        let client = ChatClient::new("test-key".to_string());
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");

        let client = client.with_api_base("http://127.0.0.1:9999/v1");
        assert_eq!(client.endpoint(), "http://127.0.0.1:9999/v1/chat/completions");
    }

    #[test]
    fn test_engine_follows_model() {
        let client = ChatClient::new("test-key".to_string()).with_model("gpt-4o-mini");
        assert_eq!(client.engine(), "gpt-4o-mini");
        assert_eq!(client.name(), "OpenAI Chat");
    }

    #[test]
    fn test_request_serialization() {
        let messages = vec![
            Message::system("You are an AI assistant that summarizes transcripts"),
            Message::user("Summarize this."),
        ];
        let request = ChatRequest {
            model: "gpt-3.5-turbo",
            messages: &messages,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Summarize this.");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": " A summary. "}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_empty_choices_parse() {
        let body = r#"{"choices": []}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
