use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use std::env;
use std::time::{Duration, Instant};

use super::prompt::{PromptBuilder, PromptGuide};
use super::{ChatResponse, Inferencer};
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::errors::RagError;
use crate::http_handler::handle_response;
use crate::types::{ChatMessage, InferenceResult, SearchRecord};

pub const GATEWAY_BASE_URL: &str = "https://api.openai.com/v1";

/// Talks to any OpenAI-compatible chat completions endpoint.
///
/// Without an explicit key, `OPENAI_API_KEY` is used; with neither, requests
/// go out unauthenticated for gateways that do not require a key.
pub struct GatewayInferencer {
    pub url: String,
    api_key: Option<String>,
    model_id: String,
    prompt: PromptBuilder,
    timeout: Duration,
    client: Client,
}

#[derive(Serialize, Debug)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

impl GatewayInferencer {
    pub fn new(
        model_id: &str,
        api_key: Option<String>,
        base_url: Option<String>,
        n_shot_prompts: usize,
        prompt_guide: Option<PromptGuide>,
    ) -> Self {
        let url = match base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => GATEWAY_BASE_URL.to_string(),
        };
        GatewayInferencer {
            url,
            api_key: api_key.or_else(|| env::var("OPENAI_API_KEY").ok()),
            model_id: model_id.to_string(),
            prompt: PromptBuilder::new(prompt_guide, n_shot_prompts),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn with_prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }
}

#[async_trait]
impl Inferencer for GatewayInferencer {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate_prompt(&self, user_query: &str, context: &[SearchRecord]) -> Vec<ChatMessage> {
        self.prompt.build(user_query, context)
    }

    async fn generate_text(
        &self,
        user_query: &str,
        context: &[SearchRecord],
    ) -> Result<InferenceResult, RagError> {
        let messages = self.generate_prompt(user_query, context);
        let body = ChatRequestBody {
            model: &self.model_id,
            messages: &messages,
        };
        let chat_url = format!("{}/chat/completions", self.url);
        debug!(
            "rag-inference: gateway request to {} with {} messages",
            chat_url,
            messages.len()
        );

        let start = Instant::now();
        let mut req = self
            .client
            .post(&chat_url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        let response = req.send().await?;
        let chat_response = handle_response::<ChatResponse>(response, "chat_completions").await?;
        let elapsed = start.elapsed();

        chat_response.into_result(elapsed)
    }
}
