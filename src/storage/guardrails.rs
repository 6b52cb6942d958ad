use async_trait::async_trait;
use log::{debug, info};
use std::ops::ControlFlow;

use super::{BlockLevel, BlockMetadata, VectorStorage, VectorStorageSearchResponse};
use crate::config::GuardrailConfig;
use crate::errors::RagError;
use crate::guardrails::bedrock::BedrockGuardrail;
use crate::guardrails::{Guardrail, GuardrailSource};
use crate::types::Chunk;

type Stage = ControlFlow<VectorStorageSearchResponse>;

/// Wraps a vector store with guardrail checks on the query (`apply_prompt`)
/// and on the retrieved text (`apply_context`).
///
/// A blocked search is not an error: it comes back as `status == false`
/// with [`BlockMetadata`] describing the intervention.
pub struct GuardRailsVectorStorage<S, G> {
    storage: S,
    guardrail: G,
    apply_prompt: bool,
    apply_context: bool,
}

impl<S: VectorStorage, G: Guardrail> GuardRailsVectorStorage<S, G> {
    pub fn new(storage: S, guardrail: G, apply_prompt: bool, apply_context: bool) -> Self {
        GuardRailsVectorStorage {
            storage,
            guardrail,
            apply_prompt,
            apply_context,
        }
    }

    pub fn apply_prompt(&self) -> bool {
        self.apply_prompt
    }

    pub fn apply_context(&self) -> bool {
        self.apply_context
    }

    pub fn inner(&self) -> &S {
        &self.storage
    }

    pub fn guardrail(&self) -> &G {
        &self.guardrail
    }

    async fn check(&self, text: &str, level: BlockLevel) -> Result<Stage, RagError> {
        // both levels are evaluated as guardrail INPUT
        let verdict = self
            .guardrail
            .apply_guardrail(text, GuardrailSource::Input)
            .await?;
        if !verdict.is_intervened() {
            return Ok(ControlFlow::Continue(()));
        }
        info!("rag-inference: guarded search blocked at {}", level);
        Ok(ControlFlow::Break(VectorStorageSearchResponse::blocked(
            BlockMetadata {
                guardrail_output: verdict.output_text().to_string(),
                guardrail_output_assessment: verdict.assessments.into_iter().next(),
                block_level: level,
            },
        )))
    }

    async fn check_prompt(&self, chunk: &Chunk) -> Result<Stage, RagError> {
        if !self.apply_prompt {
            return Ok(ControlFlow::Continue(()));
        }
        self.check(&chunk.data, BlockLevel::Input).await
    }

    async fn check_context(&self, results: &VectorStorageSearchResponse) -> Result<Stage, RagError> {
        if !self.apply_context {
            return Ok(ControlFlow::Continue(()));
        }
        self.check(&results.result_text(), BlockLevel::Context).await
    }
}

impl<S: VectorStorage> GuardRailsVectorStorage<S, BedrockGuardrail> {
    /// Guards `storage` with the Bedrock guardrail described by `config`.
    pub fn from_config(storage: S, config: &GuardrailConfig) -> Self {
        GuardRailsVectorStorage::new(
            storage,
            BedrockGuardrail::from_config(config),
            config.apply_prompt,
            config.apply_context,
        )
    }
}

#[async_trait]
impl<S: VectorStorage, G: Guardrail> VectorStorage for GuardRailsVectorStorage<S, G> {
    async fn search(
        &self,
        chunk: &Chunk,
        knn: usize,
        hierarchical: bool,
    ) -> Result<VectorStorageSearchResponse, RagError> {
        if let ControlFlow::Break(blocked) = self.check_prompt(chunk).await? {
            return Ok(blocked);
        }

        let results = self.storage.search(chunk, knn, hierarchical).await?;
        debug!(
            "rag-inference: guarded search returned {} records",
            results.result.len()
        );

        if let ControlFlow::Break(blocked) = self.check_context(&results).await? {
            return Ok(blocked);
        }
        Ok(results)
    }

    async fn embed_query(
        &self,
        embedding: &[f64],
        knn: usize,
        hierarchical: bool,
    ) -> Result<VectorStorageSearchResponse, RagError> {
        self.storage.embed_query(embedding, knn, hierarchical).await
    }

    async fn write(&self, body: &serde_json::Value) -> Result<(), RagError> {
        self.storage.write(body).await
    }

    async fn read(&self, body: &serde_json::Value) -> Result<serde_json::Value, RagError> {
        self.storage.read(body).await
    }
}
