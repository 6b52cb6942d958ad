use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Serialize;
use std::env;
use std::time::{Duration, Instant};
use url::Url;

use super::prompt::{PromptBuilder, PromptGuide};
use super::{ChatResponse, Inferencer};
use crate::config::DEFAULT_REQUEST_TIMEOUT;
use crate::errors::RagError;
use crate::http_handler::handle_response;
use crate::types::{ChatMessage, InferenceResult, SearchRecord};

pub fn sagemaker_runtime_url(region: &str) -> String {
    format!("https://runtime.sagemaker.{}.amazonaws.com", region)
}

/// Invokes a SageMaker endpoint serving a chat-messages container (LMI, TGI).
///
/// `model_id` is the endpoint name. Request signing is left to whatever sits
/// in front of the runtime url; `role_arn` is kept for that layer.
pub struct SageMakerInferencer {
    pub url: String,
    model_id: String,
    region: String,
    role_arn: Option<String>,
    bearer_token: Option<String>,
    temperature: f32,
    prompt: PromptBuilder,
    timeout: Duration,
    client: Client,
}

#[derive(Serialize, Debug)]
struct MessagesBody<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
}

impl SageMakerInferencer {
    pub fn new(
        model_id: &str,
        region: &str,
        role_arn: Option<String>,
        n_shot_prompts: usize,
        temperature: f32,
        prompt_guide: Option<PromptGuide>,
        url: Option<String>,
    ) -> Self {
        let final_url = match url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => sagemaker_runtime_url(region),
        };
        SageMakerInferencer {
            url: final_url,
            model_id: model_id.to_string(),
            region: region.to_string(),
            role_arn,
            bearer_token: env::var("AWS_BEARER_TOKEN_SAGEMAKER").ok(),
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

    pub fn role_arn(&self) -> Option<&str> {
        self.role_arn.as_deref()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn invocation_url(&self) -> Result<Url, RagError> {
        let mut url = Url::parse(&self.url)?;
        url.path_segments_mut()
            .map_err(|_| RagError::MissingConfig(format!("not a base url: {}", self.url)))?
            .pop_if_empty()
            .extend(&["endpoints", self.model_id.as_str(), "invocations"]);
        Ok(url)
    }
}

#[async_trait]
impl Inferencer for SageMakerInferencer {
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
        let body = MessagesBody {
            messages: &messages,
            temperature: self.temperature,
        };
        let invocation_url = self.invocation_url()?;
        debug!(
            "rag-inference: sagemaker invocation {} (role: {:?})",
            invocation_url, self.role_arn
        );

        let start = Instant::now();
        let mut req = self
            .client
            .post(invocation_url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        let response = req.send().await?;
        let chat_response = handle_response::<ChatResponse>(response, "invocations").await?;
        let elapsed = start.elapsed();

        chat_response.into_result(elapsed)
    }
}
