use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use url::Url;

use super::prompt::{PromptBuilder, PromptGuide};
use super::Inferencer;
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::errors::RagError;
use crate::http_handler::handle_response;
use crate::types::{ChatMessage, InferenceMetadata, InferenceResult, Role, SearchRecord};

pub fn bedrock_runtime_url(region: &str) -> String {
    format!("https://bedrock-runtime.{}.amazonaws.com", region)
}

/// Bedrock Runtime `Converse` client.
pub struct BedrockInferencer {
    pub url: String,
    model_id: String,
    region: String,
    bearer_token: Option<String>,
    temperature: f32,
    prompt: PromptBuilder,
    timeout: Duration,
    client: Client,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    messages: Vec<ConverseMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<TextBlock>,
    inference_config: InferenceConfig,
}

#[derive(Serialize, Debug, PartialEq)]
struct ConverseMessage {
    role: Role,
    content: Vec<TextBlock>,
}

#[derive(Serialize, Debug, PartialEq)]
struct TextBlock {
    text: String,
}

#[derive(Serialize, Debug, PartialEq)]
struct InferenceConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct ConverseResponse {
    output: ConverseOutput,
    #[serde(default)]
    usage: Option<ConverseUsage>,
    #[serde(default)]
    metrics: Option<ConverseMetrics>,
}

#[derive(Deserialize, Debug)]
struct ConverseOutput {
    message: OutputMessage,
}

#[derive(Deserialize, Debug)]
struct OutputMessage {
    #[serde(default)]
    content: Vec<OutputBlock>,
}

// non-text blocks (tool use, reasoning) carry no `text`
#[derive(Deserialize, Debug)]
struct OutputBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ConverseMetrics {
    latency_ms: u64,
}

impl BedrockInferencer {
    pub fn new(
        model_id: &str,
        region: &str,
        n_shot_prompts: usize,
        temperature: f32,
        prompt_guide: Option<PromptGuide>,
        url: Option<String>,
    ) -> Self {
        let final_url = match url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => bedrock_runtime_url(region),
        };
        BedrockInferencer {
            url: final_url,
            model_id: model_id.to_string(),
            region: region.to_string(),
            // optional: requests may also go through a signing proxy
            bearer_token: env::var("AWS_BEARER_TOKEN_BEDROCK").ok(),
            temperature,
            prompt: PromptBuilder::new(prompt_guide, n_shot_prompts),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            client: Client::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    pub fn with_prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn converse_url(&self) -> Result<Url, RagError> {
        let mut url = Url::parse(&self.url)?;
        url.path_segments_mut()
            .map_err(|_| RagError::MissingConfig(format!("not a base url: {}", self.url)))?
            .pop_if_empty()
            .extend(&["model", self.model_id.as_str(), "converse"]);
        Ok(url)
    }
}

// Converse wants a user-first conversation, so system turns move to the
// `system` field and the remaining turns are folded into a single user message
fn build_converse_request(messages: &[ChatMessage], temperature: f32) -> ConverseRequest {
    let mut system = Vec::new();
    let mut content = Vec::new();
    for msg in messages {
        let block = TextBlock {
            text: msg.content.clone(),
        };
        match msg.role {
            Role::System => system.push(block),
            Role::User | Role::Assistant => content.push(block),
        }
    }
    ConverseRequest {
        messages: vec![ConverseMessage {
            role: Role::User,
            content,
        }],
        system,
        inference_config: InferenceConfig { temperature },
    }
}

impl ConverseResponse {
    fn into_result(self, elapsed: Duration) -> InferenceResult {
        if let Some(metrics) = &self.metrics {
            debug!(
                "rag-inference: bedrock reported {}ms, measured {}ms",
                metrics.latency_ms,
                elapsed.as_millis()
            );
        }
        let usage = self.usage.unwrap_or_default();
        let text = self
            .output
            .message
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<String>>()
            .join("");
        InferenceResult {
            metadata: InferenceMetadata::from_usage(
                usage.input_tokens,
                usage.output_tokens,
                usage.total_tokens,
            )
            .with_latency(elapsed),
            text,
        }
    }
}

#[async_trait]
impl Inferencer for BedrockInferencer {
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
        let body = build_converse_request(&messages, self.temperature);
        let converse_url = self.converse_url()?;
        debug!(
            "rag-inference: bedrock converse request to {} with {} turns",
            converse_url,
            messages.len()
        );

        let start = Instant::now();
        let mut req = self
            .client
            .post(converse_url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        let response = req.send().await?;
        let converse = handle_response::<ConverseResponse>(response, "converse").await?;
        let elapsed = start.elapsed();

        Ok(converse.into_result(elapsed))
    }
}
