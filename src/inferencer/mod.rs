pub mod bedrock;
pub mod gateway;
pub mod prompt;
pub mod sagemaker;

use async_trait::async_trait;
use log::info;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::config::InferencerConfig;
use crate::errors::RagError;
use crate::types::{ChatMessage, InferenceMetadata, InferenceResult, SearchRecord};

use bedrock::BedrockInferencer;
use gateway::GatewayInferencer;
use sagemaker::SageMakerInferencer;

#[async_trait]
pub trait Inferencer: Send + Sync {
    fn model_id(&self) -> &str;

    /// Assembles the turns that would be sent for this query.
    fn generate_prompt(&self, user_query: &str, context: &[SearchRecord]) -> Vec<ChatMessage>;

    /// Sends one request to the endpoint. `latency_ms` in the returned
    /// metadata is the measured wall-clock time of that request.
    async fn generate_text(
        &self,
        user_query: &str,
        context: &[SearchRecord],
    ) -> Result<InferenceResult, RagError>;
}

// OpenAI-compatible chat completion response, shared by the gateway and
// sagemaker messages endpoints
#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatResponse {
    pub fn into_result(self, elapsed: Duration) -> Result<InferenceResult, RagError> {
        let usage = self.usage.unwrap_or_default();
        let metadata = InferenceMetadata::from_usage(
            usage.prompt_tokens,
            usage.completion_tokens,
            usage.total_tokens,
        )
        .with_latency(elapsed);
        let text = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RagError::MalformedResponse("no choices in chat response".to_string()))?
            .message
            .content
            .unwrap_or_default();
        Ok(InferenceResult { metadata, text })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceName {
    Bedrock,
    SageMaker,
}

impl FromStr for ServiceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bedrock" => Ok(ServiceName::Bedrock),
            "sagemaker" => Ok(ServiceName::SageMaker),
            _ => Err(format!("Invalid value: {}", s)),
        }
    }
}

impl Display for ServiceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            ServiceName::Bedrock => write!(f, "bedrock"),
            ServiceName::SageMaker => write!(f, "sagemaker"),
        }
    }
}

/// The closed set of inference clients the factory can build.
pub enum InferencerProvider {
    Gateway(GatewayInferencer),
    Bedrock(BedrockInferencer),
    SageMaker(SageMakerInferencer),
}

impl InferencerProvider {
    fn inner(&self) -> &dyn Inferencer {
        match self {
            InferencerProvider::Gateway(i) => i,
            InferencerProvider::Bedrock(i) => i,
            InferencerProvider::SageMaker(i) => i,
        }
    }
}

#[async_trait]
impl Inferencer for InferencerProvider {
    fn model_id(&self) -> &str {
        self.inner().model_id()
    }

    fn generate_prompt(&self, user_query: &str, context: &[SearchRecord]) -> Vec<ChatMessage> {
        self.inner().generate_prompt(user_query, context)
    }

    async fn generate_text(
        &self,
        user_query: &str,
        context: &[SearchRecord],
    ) -> Result<InferenceResult, RagError> {
        self.inner().generate_text(user_query, context).await
    }
}

/// Picks the inference client for a configuration. The gateway wins whenever
/// it is enabled; otherwise `service` must name a known provider.
pub fn create_inferencer(config: &InferencerConfig) -> Result<InferencerProvider, RagError> {
    if config.gateway_enabled {
        info!("rag-inference: using gateway inferencer for {}", config.model_id);
        let inferencer = GatewayInferencer::new(
            &config.model_id,
            config.api_key.clone(),
            config.base_url.clone(),
            config.n_shot_prompts,
            config.prompt_guide.clone(),
        )
        .with_timeout(config.request_timeout);
        return Ok(InferencerProvider::Gateway(inferencer));
    }

    let service = config
        .service
        .parse::<ServiceName>()
        .map_err(|_| RagError::UnsupportedService(config.service.clone()))?;
    info!(
        "rag-inference: using {} inferencer for {} in {}",
        service, config.model_id, config.region
    );
    match service {
        ServiceName::Bedrock => {
            let inferencer = BedrockInferencer::new(
                &config.model_id,
                &config.region,
                config.n_shot_prompts,
                config.temperature,
                config.prompt_guide.clone(),
                config.endpoint_url.clone(),
            )
            .with_timeout(config.request_timeout);
            Ok(InferencerProvider::Bedrock(inferencer))
        }
        ServiceName::SageMaker => {
            let inferencer = SageMakerInferencer::new(
                &config.model_id,
                &config.region,
                config.role_arn.clone(),
                config.n_shot_prompts,
                config.temperature,
                config.prompt_guide.clone(),
                config.endpoint_url.clone(),
            )
            .with_timeout(config.request_timeout);
            Ok(InferencerProvider::SageMaker(inferencer))
        }
    }
}
