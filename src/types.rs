use serde::{Deserialize, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(format!("Invalid value: {}", s)),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A single turn of a prompt. An ordered `Vec<ChatMessage>` is what gets sent
/// to a chat endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// The text used to query a vector store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub data: String,
}

impl Chunk {
    pub fn new(data: impl Into<String>) -> Self {
        Chunk { data: data.into() }
    }
}

/// A retrieved passage. Everything besides `text` is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub text: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SearchRecord {
    pub fn new(text: impl Into<String>) -> Self {
        SearchRecord {
            text: text.into(),
            metadata: serde_json::Map::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceMetadata {
    #[serde(serialize_with = "as_string")]
    pub input_tokens: u64,
    #[serde(serialize_with = "as_string")]
    pub output_tokens: u64,
    #[serde(serialize_with = "as_string")]
    pub total_tokens: u64,
    #[serde(serialize_with = "as_string")]
    pub latency_ms: u64,
}

impl InferenceMetadata {
    pub fn from_usage(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        InferenceMetadata {
            input_tokens,
            output_tokens,
            total_tokens,
            latency_ms: 0,
        }
    }

    // measured latency always wins over anything the provider reported
    pub fn with_latency(mut self, elapsed: std::time::Duration) -> Self {
        self.latency_ms = elapsed.as_millis() as u64;
        self
    }
}

fn as_string<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InferenceResult {
    pub metadata: InferenceMetadata,
    pub text: String,
}
