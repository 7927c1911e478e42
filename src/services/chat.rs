//! Language-model chat service (Groq)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Request timeout for chat completions
const CHAT_TIMEOUT: Duration = Duration::from_secs(30);

/// General-purpose language-model collaborator
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Complete a single user turn under a system prompt
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String>;
}

/// Groq chat completions client (OpenAI-compatible API)
pub struct GroqChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl GroqChat {
    /// Create a new Groq chat client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Groq API key required for chat".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::builder()
                .timeout(CHAT_TIMEOUT)
                .build()
                .map_err(Error::Http)?,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl ChatService for GroqChat {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
        };

        let response = self
            .client
            .post("https://api.groq.com/openai/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Llm(format!("chat API error {status}: {body}")));
        }

        let result: ChatResponse = response.json().await?;
        let content = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Llm("empty chat response".to_string()))?;

        Ok(content)
    }
}
