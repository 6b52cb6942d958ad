use serde::Deserialize;
use std::env;
use std::str::FromStr;
use url::Url;

use crate::errors::RagError;
use crate::inferencer::prompt::PromptGuide;

pub const DEFAULT_REQUEST_TIMEOUT: u64 = 120;

// settings that are read from the environment
#[derive(Clone, Copy, Debug)]
pub enum ConfigKey {
    GatewayEnabled,
    GatewayBaseUrl,
    GatewayApiKey,
    Service,
    ModelId,
    Region,
    RoleArn,
    EndpointUrl,
    NShotPrompts,
    Temperature,
    PromptGuidePath,
    RequestTimeout,
    GuardrailId,
    GuardrailVersion,
    GuardrailServiceUrl,
    ApplyGuardrailPrompt,
    ApplyGuardrailContext,
}

impl ConfigKey {
    pub fn env_name(&self) -> &'static str {
        match self {
            ConfigKey::GatewayEnabled => "GATEWAY_ENABLED",
            ConfigKey::GatewayBaseUrl => "GATEWAY_BASE_URL",
            ConfigKey::GatewayApiKey => "GATEWAY_API_KEY",
            ConfigKey::Service => "INFERENCE_SERVICE",
            ConfigKey::ModelId => "MODEL_ID",
            ConfigKey::Region => "AWS_REGION",
            ConfigKey::RoleArn => "SAGEMAKER_ROLE_ARN",
            ConfigKey::EndpointUrl => "ENDPOINT_URL",
            ConfigKey::NShotPrompts => "N_SHOT_PROMPTS",
            ConfigKey::Temperature => "TEMPERATURE",
            ConfigKey::PromptGuidePath => "PROMPT_GUIDE_PATH",
            ConfigKey::RequestTimeout => "REQUEST_TIMEOUT",
            ConfigKey::GuardrailId => "GUARDRAIL_ID",
            ConfigKey::GuardrailVersion => "GUARDRAIL_VERSION",
            ConfigKey::GuardrailServiceUrl => "GUARDRAIL_SERVICE_URL",
            ConfigKey::ApplyGuardrailPrompt => "APPLY_GUARDRAIL_PROMPT",
            ConfigKey::ApplyGuardrailContext => "APPLY_GUARDRAIL_CONTEXT",
        }
    }

    fn get(&self) -> Option<String> {
        env::var(self.env_name()).ok().filter(|v| !v.is_empty())
    }

    fn get_or(&self, default: &str) -> String {
        from_env_default(self.env_name(), default)
    }

    fn parse_or<T: FromStr>(&self, default: T) -> Result<T, RagError> {
        match self.get() {
            Some(raw) => raw.trim().parse::<T>().map_err(|_| {
                RagError::MissingConfig(format!("{}: cannot parse '{}'", self.env_name(), raw))
            }),
            None => Ok(default),
        }
    }

    fn flag(&self) -> Result<bool, RagError> {
        match self.get() {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                RagError::MissingConfig(format!("{}: not a boolean '{}'", self.env_name(), raw))
            }),
            None => Ok(false),
        }
    }
}

/// source a variable from environment - use default if not exists
pub fn from_env_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Everything the inferencer factory needs to pick and build a client.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct InferencerConfig {
    #[serde(default)]
    pub gateway_enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_service")]
    pub service: String,
    pub model_id: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub role_arn: Option<String>,
    /// Replaces the AWS runtime endpoint for Bedrock and SageMaker, e.g. a
    /// signing proxy.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub n_shot_prompts: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub prompt_guide: Option<PromptGuide>,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
}

fn default_service() -> String {
    "bedrock".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

impl InferencerConfig {
    pub fn new(service: &str, model_id: &str) -> Self {
        InferencerConfig {
            gateway_enabled: false,
            base_url: None,
            api_key: None,
            service: service.to_string(),
            model_id: model_id.to_string(),
            region: default_region(),
            role_arn: None,
            endpoint_url: None,
            n_shot_prompts: 0,
            temperature: default_temperature(),
            prompt_guide: None,
            request_timeout: default_timeout(),
        }
    }

    pub fn from_env() -> Result<Self, RagError> {
        let model_id = ConfigKey::ModelId.get().ok_or_else(|| {
            RagError::MissingConfig(format!("{} not set", ConfigKey::ModelId.env_name()))
        })?;
        let base_url = match ConfigKey::GatewayBaseUrl.get() {
            Some(raw) => Some(validate_url(&raw)?),
            None => None,
        };
        let endpoint_url = match ConfigKey::EndpointUrl.get() {
            Some(raw) => Some(validate_url(&raw)?),
            None => None,
        };
        let prompt_guide = match ConfigKey::PromptGuidePath.get() {
            Some(path) => Some(PromptGuide::from_path(path)?),
            None => None,
        };
        Ok(InferencerConfig {
            gateway_enabled: ConfigKey::GatewayEnabled.flag()?,
            base_url,
            api_key: ConfigKey::GatewayApiKey.get(),
            service: ConfigKey::Service.get_or("bedrock"),
            model_id,
            region: ConfigKey::Region.get_or("us-east-1"),
            role_arn: ConfigKey::RoleArn.get(),
            endpoint_url,
            n_shot_prompts: ConfigKey::NShotPrompts.parse_or(0)?,
            temperature: ConfigKey::Temperature.parse_or(default_temperature())?,
            prompt_guide,
            request_timeout: ConfigKey::RequestTimeout.parse_or(DEFAULT_REQUEST_TIMEOUT)?,
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GuardrailConfig {
    pub guardrail_id: String,
    pub guardrail_version: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub apply_prompt: bool,
    #[serde(default)]
    pub apply_context: bool,
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,
}

impl GuardrailConfig {
    pub fn from_env() -> Result<Self, RagError> {
        let guardrail_id = ConfigKey::GuardrailId.get().ok_or_else(|| {
            RagError::MissingConfig(format!("{} not set", ConfigKey::GuardrailId.env_name()))
        })?;
        let service_url = match ConfigKey::GuardrailServiceUrl.get() {
            Some(raw) => Some(validate_url(&raw)?),
            None => None,
        };
        Ok(GuardrailConfig {
            guardrail_id,
            guardrail_version: ConfigKey::GuardrailVersion.get_or("DRAFT"),
            region: ConfigKey::Region.get_or("us-east-1"),
            service_url,
            apply_prompt: ConfigKey::ApplyGuardrailPrompt.flag()?,
            apply_context: ConfigKey::ApplyGuardrailContext.flag()?,
            request_timeout: ConfigKey::RequestTimeout.parse_or(DEFAULT_REQUEST_TIMEOUT)?,
        })
    }
}

// parses the url and strips any trailing slash so paths can be appended
pub fn validate_url(raw: &str) -> Result<String, RagError> {
    let parsed = Url::parse(raw)?;
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 1 "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(
            validate_url("http://localhost:8080/api/openai/v1/").unwrap(),
            "http://localhost:8080/api/openai/v1"
        );
        assert_eq!(
            validate_url("https://gateway.example.com").unwrap(),
            "https://gateway.example.com"
        );
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let cfg: InferencerConfig = serde_json::from_value(serde_json::json!({
            "model_id": "anthropic.claude-3-haiku",
        }))
        .unwrap();
        assert_eq!(cfg, InferencerConfig::new("bedrock", "anthropic.claude-3-haiku"));
        assert_eq!(cfg.temperature, 0.7);
        assert_eq!(cfg.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_config_with_inline_guide() {
        let cfg: InferencerConfig = serde_json::from_value(serde_json::json!({
            "gateway_enabled": true,
            "base_url": "http://localhost:8080",
            "api_key": "sk-test",
            "service": "anything",
            "model_id": "gpt-4o-mini",
            "n_shot_prompts": 2,
            "prompt_guide": {
                "user_prompt": "Be concise",
                "examples": [{"example": "one"}]
            }
        }))
        .unwrap();
        assert!(cfg.gateway_enabled);
        assert_eq!(cfg.n_shot_prompts, 2);
        let guide = cfg.prompt_guide.unwrap();
        assert_eq!(guide.user_prompt.as_deref(), Some("Be concise"));
        assert_eq!(guide.examples.len(), 1);
    }

    const ALL_KEYS: [ConfigKey; 17] = [
        ConfigKey::GatewayEnabled,
        ConfigKey::GatewayBaseUrl,
        ConfigKey::GatewayApiKey,
        ConfigKey::Service,
        ConfigKey::ModelId,
        ConfigKey::Region,
        ConfigKey::RoleArn,
        ConfigKey::EndpointUrl,
        ConfigKey::NShotPrompts,
        ConfigKey::Temperature,
        ConfigKey::PromptGuidePath,
        ConfigKey::RequestTimeout,
        ConfigKey::GuardrailId,
        ConfigKey::GuardrailVersion,
        ConfigKey::GuardrailServiceUrl,
        ConfigKey::ApplyGuardrailPrompt,
        ConfigKey::ApplyGuardrailContext,
    ];

    // tests in this module share the process environment
    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn with_env<T>(vars: &[(ConfigKey, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for key in ALL_KEYS {
            env::remove_var(key.env_name());
        }
        for (key, value) in vars {
            env::set_var(key.env_name(), value);
        }
        let out = f();
        for key in ALL_KEYS {
            env::remove_var(key.env_name());
        }
        out
    }

    #[test]
    fn test_env_names_are_unique() {
        let names: std::collections::HashSet<&str> =
            ALL_KEYS.iter().map(|k| k.env_name()).collect();
        assert_eq!(names.len(), ALL_KEYS.len());
    }

    #[test]
    fn test_inferencer_from_env_defaults() {
        let cfg = with_env(&[(ConfigKey::ModelId, "anthropic.claude-3-haiku")], || {
            InferencerConfig::from_env()
        })
        .unwrap();
        assert_eq!(cfg, InferencerConfig::new("bedrock", "anthropic.claude-3-haiku"));
        assert_eq!(cfg.region, "us-east-1");
        assert_eq!(cfg.request_timeout, 120);
        assert!(!cfg.gateway_enabled);
    }

    #[test]
    fn test_inferencer_from_env_values() {
        let cfg = with_env(
            &[
                (ConfigKey::ModelId, "gpt-4o-mini"),
                (ConfigKey::GatewayEnabled, "true"),
                (ConfigKey::GatewayBaseUrl, "http://localhost:8080/v1/"),
                (ConfigKey::GatewayApiKey, "sk-env"),
                (ConfigKey::Service, "sagemaker"),
                (ConfigKey::Region, "eu-west-1"),
                (ConfigKey::EndpointUrl, "http://signing-proxy:9000"),
                (ConfigKey::NShotPrompts, "3"),
                (ConfigKey::Temperature, "0.25"),
                (ConfigKey::RequestTimeout, "30"),
            ],
            InferencerConfig::from_env,
        )
        .unwrap();
        assert!(cfg.gateway_enabled);
        assert_eq!(cfg.base_url.as_deref(), Some("http://localhost:8080/v1"));
        assert_eq!(cfg.api_key.as_deref(), Some("sk-env"));
        assert_eq!(cfg.service, "sagemaker");
        assert_eq!(cfg.region, "eu-west-1");
        assert_eq!(cfg.endpoint_url.as_deref(), Some("http://signing-proxy:9000"));
        assert_eq!(cfg.n_shot_prompts, 3);
        assert_eq!(cfg.temperature, 0.25);
        assert_eq!(cfg.request_timeout, 30);
    }

    #[test]
    fn test_inferencer_from_env_requires_model_id() {
        let err = with_env(&[], InferencerConfig::from_env).unwrap_err();
        assert!(matches!(err, RagError::MissingConfig(_)));
        assert!(err.to_string().contains("MODEL_ID"));
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = with_env(
            &[(ConfigKey::ModelId, "m"), (ConfigKey::NShotPrompts, "abc")],
            InferencerConfig::from_env,
        )
        .unwrap_err();
        assert!(matches!(err, RagError::MissingConfig(_)));
        assert!(err.to_string().contains("N_SHOT_PROMPTS"));

        let err = with_env(
            &[(ConfigKey::ModelId, "m"), (ConfigKey::GatewayEnabled, "maybe")],
            InferencerConfig::from_env,
        )
        .unwrap_err();
        assert!(err.to_string().contains("GATEWAY_ENABLED"));

        let err = with_env(
            &[
                (ConfigKey::GuardrailId, "gr-1"),
                (ConfigKey::ApplyGuardrailContext, "sometimes"),
            ],
            GuardrailConfig::from_env,
        )
        .unwrap_err();
        assert!(err.to_string().contains("APPLY_GUARDRAIL_CONTEXT"));
    }

    #[test]
    fn test_guardrail_from_env() {
        let err = with_env(&[], GuardrailConfig::from_env).unwrap_err();
        assert!(err.to_string().contains("GUARDRAIL_ID"));

        let cfg = with_env(&[(ConfigKey::GuardrailId, "gr-1")], GuardrailConfig::from_env).unwrap();
        assert_eq!(cfg.guardrail_version, "DRAFT");
        assert_eq!(cfg.region, "us-east-1");
        assert_eq!(cfg.service_url, None);
        assert!(!cfg.apply_prompt);
        assert!(!cfg.apply_context);
        assert_eq!(cfg.request_timeout, 120);

        let cfg = with_env(
            &[
                (ConfigKey::GuardrailId, "gr-1"),
                (ConfigKey::GuardrailVersion, "2"),
                (ConfigKey::GuardrailServiceUrl, "http://localhost:4566/"),
                (ConfigKey::ApplyGuardrailPrompt, "yes"),
                (ConfigKey::ApplyGuardrailContext, "1"),
            ],
            GuardrailConfig::from_env,
        )
        .unwrap();
        assert_eq!(cfg.guardrail_version, "2");
        assert_eq!(cfg.service_url.as_deref(), Some("http://localhost:4566"));
        assert!(cfg.apply_prompt);
        assert!(cfg.apply_context);
    }
}
