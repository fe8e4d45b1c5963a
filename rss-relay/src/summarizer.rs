use crate::types::{RelayError, Result, Summary};
use async_trait::async_trait;
use interfaces::Summarizer;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// "Summarize the following post in Korean and output only the result: "
const PROMPT_PREFIX: &str = "다음 게시물 내용을 한국어로 요약해서 오직 결과값만 출력해줘: ";

pub fn summary_prompt(content: &str) -> String {
    format!("{}{}", PROMPT_PREFIX, content)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Summarizer for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiSummarizer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiSummarizer {
    pub fn new(client: Client, api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn request_summary(&self, content: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: summary_prompt(content),
            }],
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::General(format!("chat completion returned HTTP {}: {}", status, body)));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RelayError::General("chat completion returned no message content".to_string()))
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, content: &str) -> Summary {
        match self.request_summary(content).await {
            Ok(summary) if summary.trim().is_empty() => {
                warn!("Model returned an empty summary");
                None
            }
            Ok(summary) => {
                debug!("Summary generated ({} chars)", summary.chars().count());
                Some(summary)
            }
            Err(e) => {
                warn!("Error summarizing article: {}", e);
                None
            }
        }
    }
}
