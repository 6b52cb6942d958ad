pub mod common {
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use rag_inference::storage::{VectorStorage, VectorStorageSearchResponse};
    use rag_inference::{Chunk, RagError, SearchRecord};

    /// Vector store double that serves a fixed list of passages and counts calls.
    #[allow(dead_code)]
    pub struct InMemoryStore {
        records: Vec<SearchRecord>,
        searches: AtomicUsize,
        writes: Mutex<Vec<serde_json::Value>>,
    }

    #[allow(dead_code)]
    impl InMemoryStore {
        pub fn new(texts: &[&str]) -> Self {
            let records = texts
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let mut record = SearchRecord::new(*text);
                    record
                        .metadata
                        .insert("id".to_string(), serde_json::json!(i + 1));
                    record
                })
                .collect();
            InMemoryStore {
                records,
                searches: AtomicUsize::new(0),
                writes: Mutex::new(Vec::new()),
            }
        }

        pub fn search_count(&self) -> usize {
            self.searches.load(Ordering::SeqCst)
        }

        pub fn written(&self) -> Vec<serde_json::Value> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VectorStorage for InMemoryStore {
        async fn search(
            &self,
            _chunk: &Chunk,
            knn: usize,
            _hierarchical: bool,
        ) -> Result<VectorStorageSearchResponse, RagError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(VectorStorageSearchResponse::ok(
                self.records.iter().take(knn).cloned().collect(),
            ))
        }

        async fn embed_query(
            &self,
            _embedding: &[f64],
            knn: usize,
            _hierarchical: bool,
        ) -> Result<VectorStorageSearchResponse, RagError> {
            Ok(VectorStorageSearchResponse::ok(
                self.records.iter().take(knn).cloned().collect(),
            ))
        }

        async fn write(&self, body: &serde_json::Value) -> Result<(), RagError> {
            self.writes.lock().unwrap().push(body.clone());
            Ok(())
        }

        async fn read(&self, _body: &serde_json::Value) -> Result<serde_json::Value, RagError> {
            Ok(serde_json::to_value(&self.records)?)
        }
    }

    #[allow(dead_code)]
    pub fn chat_completion_body(content: &str) -> String {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 21, "completion_tokens": 4, "total_tokens": 25},
            "latencyMs": 987654
        })
        .to_string()
    }

    #[allow(dead_code)]
    pub fn converse_body(content: &str) -> String {
        serde_json::json!({
            "output": {"message": {"role": "assistant", "content": [{"text": content}]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 30, "outputTokens": 6, "totalTokens": 36},
            "metrics": {"latencyMs": 987654}
        })
        .to_string()
    }

    #[allow(dead_code)]
    pub fn guardrail_body(intervened: bool) -> String {
        if intervened {
            serde_json::json!({
                "usage": {"topicPolicyUnits": 1},
                "action": "GUARDRAIL_INTERVENED",
                "outputs": [{"text": "Sorry, the model cannot answer this question."}],
                "assessments": [{"topicPolicy": {"topics": [{"name": "weapons", "type": "DENY", "action": "BLOCKED"}]}}]
            })
            .to_string()
        } else {
            serde_json::json!({
                "usage": {"topicPolicyUnits": 1},
                "action": "NONE",
                "outputs": [],
                "assessments": []
            })
            .to_string()
        }
    }
}
