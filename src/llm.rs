//! Chat-completion client used for scripts, translations and copywriting.

use crate::config::Config;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>, temperature: f32) -> Result<String>;

    /// Single user-turn prompt.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.chat(vec![ChatMessage::user(prompt)], temperature).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
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

pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiChat {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.chat_model.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    async fn chat(&self, messages: Vec<ChatMessage>, temperature: f32) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| PipelineError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };
        let res = self
            .client
            .post(CHAT_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(PipelineError::Api {
                service: "chat completions".to_string(),
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = res.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!("Chat reply: {:.200}", content);
        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted language model for adapter tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays queued replies in order; an empty queue behaves like an outage.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(PipelineError::Config("offline".to_string())));
            self
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn chat(&self, messages: Vec<ChatMessage>, _temperature: f32) -> Result<String> {
            let joined = messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            self.prompts.lock().unwrap().push(joined);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PipelineError::Config("offline".to_string())))
        }
    }
}
