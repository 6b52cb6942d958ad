pub mod guardrails;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::errors::RagError;
use crate::types::{Chunk, SearchRecord};

/// Where a guarded search was stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockLevel {
    Input,
    Context,
}

impl Display for BlockLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            BlockLevel::Input => write!(f, "INPUT"),
            BlockLevel::Context => write!(f, "CONTEXT"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub guardrail_output: String,
    pub guardrail_output_assessment: Option<serde_json::Value>,
    pub block_level: BlockLevel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorStorageSearchResponse {
    pub status: bool,
    #[serde(default)]
    pub result: Vec<SearchRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BlockMetadata>,
}

impl VectorStorageSearchResponse {
    pub fn ok(result: Vec<SearchRecord>) -> Self {
        VectorStorageSearchResponse {
            status: true,
            result,
            metadata: None,
        }
    }

    // a blocked response never carries records
    pub fn blocked(metadata: BlockMetadata) -> Self {
        VectorStorageSearchResponse {
            status: false,
            result: Vec::new(),
            metadata: Some(metadata),
        }
    }

    pub fn block_level(&self) -> Option<BlockLevel> {
        self.metadata.as_ref().map(|m| m.block_level)
    }

    /// Text of every record, space separated.
    pub fn result_text(&self) -> String {
        self.result
            .iter()
            .map(|record| record.text.as_str())
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

/// The vector store collaborator. Implementations live outside this crate.
#[async_trait]
pub trait VectorStorage: Send + Sync {
    async fn search(
        &self,
        chunk: &Chunk,
        knn: usize,
        hierarchical: bool,
    ) -> Result<VectorStorageSearchResponse, RagError>;

    async fn embed_query(
        &self,
        embedding: &[f64],
        knn: usize,
        hierarchical: bool,
    ) -> Result<VectorStorageSearchResponse, RagError>;

    async fn write(&self, body: &serde_json::Value) -> Result<(), RagError>;

    async fn read(&self, body: &serde_json::Value) -> Result<serde_json::Value, RagError>;
}
