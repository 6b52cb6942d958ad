use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;
use std::env;
use std::time::Duration;
use url::Url;

use super::{Guardrail, GuardrailResponse, GuardrailSource};
use crate::config::{GuardrailConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::errors::RagError;
use crate::http_handler::handle_response;
use crate::inferencer::bedrock::bedrock_runtime_url;

/// Bedrock `ApplyGuardrail` client.
pub struct BedrockGuardrail {
    pub url: String,
    guardrail_id: String,
    guardrail_version: String,
    bearer_token: Option<String>,
    timeout: Duration,
    client: Client,
}

#[derive(Serialize, Debug)]
struct ApplyGuardrailBody<'a> {
    source: GuardrailSource,
    content: Vec<GuardrailContent<'a>>,
}

#[derive(Serialize, Debug)]
struct GuardrailContent<'a> {
    text: GuardrailText<'a>,
}

#[derive(Serialize, Debug)]
struct GuardrailText<'a> {
    text: &'a str,
}

impl BedrockGuardrail {
    pub fn new(
        guardrail_id: &str,
        guardrail_version: &str,
        region: &str,
        url: Option<String>,
    ) -> Self {
        let final_url = match url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => bedrock_runtime_url(region),
        };
        BedrockGuardrail {
            url: final_url,
            guardrail_id: guardrail_id.to_string(),
            guardrail_version: guardrail_version.to_string(),
            bearer_token: env::var("AWS_BEARER_TOKEN_BEDROCK").ok(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &GuardrailConfig) -> Self {
        BedrockGuardrail::new(
            &config.guardrail_id,
            &config.guardrail_version,
            &config.region,
            config.service_url.clone(),
        )
        .with_timeout(config.request_timeout)
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token;
        self
    }

    fn apply_url(&self) -> Result<Url, RagError> {
        let mut url = Url::parse(&self.url)?;
        url.path_segments_mut()
            .map_err(|_| RagError::MissingConfig(format!("not a base url: {}", self.url)))?
            .pop_if_empty()
            .extend(&[
                "guardrail",
                self.guardrail_id.as_str(),
                "version",
                self.guardrail_version.as_str(),
                "apply",
            ]);
        Ok(url)
    }
}

#[async_trait]
impl Guardrail for BedrockGuardrail {
    async fn apply_guardrail(
        &self,
        text: &str,
        source: GuardrailSource,
    ) -> Result<GuardrailResponse, RagError> {
        let body = ApplyGuardrailBody {
            source,
            content: vec![GuardrailContent {
                text: GuardrailText { text },
            }],
        };
        let apply_url = self.apply_url()?;
        debug!(
            "rag-inference: applying guardrail {} to {} chars of {}",
            self.guardrail_id,
            text.len(),
            source
        );
        let mut req = self
            .client
            .post(apply_url)
            .timeout(self.timeout)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(token) = &self.bearer_token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        let response = req.send().await?;
        let verdict = handle_response::<GuardrailResponse>(response, "apply_guardrail").await?;
        if verdict.is_intervened() {
            info!("rag-inference: guardrail {} intervened", self.guardrail_id);
        }
        Ok(verdict)
    }
}
