pub mod bedrock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::errors::RagError;

/// Which side of the exchange the checked text came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuardrailSource {
    Input,
    Output,
}

impl Display for GuardrailSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            GuardrailSource::Input => write!(f, "INPUT"),
            GuardrailSource::Output => write!(f, "OUTPUT"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum GuardrailAction {
    Intervened,
    None,
}

impl From<String> for GuardrailAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "GUARDRAIL_INTERVENED" => GuardrailAction::Intervened,
            _ => GuardrailAction::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GuardrailOutput {
    #[serde(default)]
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GuardrailResponse {
    pub action: GuardrailAction,
    #[serde(default)]
    pub outputs: Vec<GuardrailOutput>,
    #[serde(default)]
    pub assessments: Vec<serde_json::Value>,
}

impl GuardrailResponse {
    pub fn allowed() -> Self {
        GuardrailResponse {
            action: GuardrailAction::None,
            outputs: Vec::new(),
            assessments: Vec::new(),
        }
    }

    pub fn intervened(output: &str) -> Self {
        GuardrailResponse {
            action: GuardrailAction::Intervened,
            outputs: vec![GuardrailOutput {
                text: output.to_string(),
            }],
            assessments: Vec::new(),
        }
    }

    pub fn is_intervened(&self) -> bool {
        self.action == GuardrailAction::Intervened
    }

    /// The replacement text the guardrail returned, if any.
    pub fn output_text(&self) -> &str {
        self.outputs.first().map(|o| o.text.as_str()).unwrap_or("")
    }
}

#[async_trait]
pub trait Guardrail: Send + Sync {
    async fn apply_guardrail(
        &self,
        text: &str,
        source: GuardrailSource,
    ) -> Result<GuardrailResponse, RagError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing() {
        let resp: GuardrailResponse = serde_json::from_value(serde_json::json!({
            "action": "GUARDRAIL_INTERVENED",
            "outputs": [{"text": "Sorry, I cannot help with that."}],
            "assessments": [{"topicPolicy": {"topics": []}}]
        }))
        .unwrap();
        assert!(resp.is_intervened());
        assert_eq!(resp.output_text(), "Sorry, I cannot help with that.");
        assert_eq!(resp.assessments.len(), 1);

        let resp: GuardrailResponse =
            serde_json::from_value(serde_json::json!({"action": "NONE"})).unwrap();
        assert!(!resp.is_intervened());
        assert_eq!(resp.output_text(), "");
    }

    #[test]
    fn test_source_wire_name() {
        assert_eq!(
            serde_json::to_value(GuardrailSource::Input).unwrap(),
            serde_json::json!("INPUT")
        );
        assert_eq!(GuardrailSource::Output.to_string(), "OUTPUT");
    }
}
