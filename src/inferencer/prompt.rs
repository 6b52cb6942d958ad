use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

use crate::errors::RagError;
use crate::types::{ChatMessage, SearchRecord};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Use the provided context to answer questions accurately. If you cannot find the answer in the context, say so";

/// Optional n-shot guidance attached to an inferencer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptGuide {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt: Option<String>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

// variant order matters: an entry carrying `example` is treated as a plain
// example even if it also has question/answer. An entry matching neither
// shape fails the whole guide at load time instead of being skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Example {
    Text { example: String },
    QuestionAnswer { question: String, answer: String },
}

impl Example {
    fn turns(&self) -> Vec<ChatMessage> {
        match self {
            Example::Text { example } => vec![ChatMessage::assistant(example.as_str())],
            Example::QuestionAnswer { question, answer } => vec![
                ChatMessage::assistant(question.as_str()),
                ChatMessage::assistant(answer.as_str()),
            ],
        }
    }
}

impl PromptGuide {
    pub fn from_json(raw: &str) -> Result<Self, RagError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// Renders retrieved passages as `Context {i}:\n{text}`, 1-indexed.
pub fn format_context(context: &[SearchRecord]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, item)| format!("Context {}:\n{}", i + 1, item.text))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Picks at most `n_shot` examples. When there are no more examples than
/// requested, all of them are kept in their original order.
pub fn select_examples<'a, R: Rng + ?Sized>(
    examples: &'a [Example],
    n_shot: usize,
    rng: &mut R,
) -> Vec<&'a Example> {
    if examples.len() > n_shot {
        examples.choose_multiple(rng, n_shot).collect()
    } else {
        examples.iter().collect()
    }
}

pub fn generate_prompt<R: Rng + ?Sized>(
    user_query: &str,
    context: &[SearchRecord],
    guide: Option<&PromptGuide>,
    n_shot: usize,
    rng: &mut R,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::user(user_query)];

    let system_prompt = guide
        .and_then(|g| g.system_prompt.as_deref())
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    messages.push(ChatMessage::system(system_prompt));

    if !context.is_empty() {
        let context_text = format_context(context);
        if !context_text.is_empty() {
            messages.push(ChatMessage::assistant(context_text));
        }
    }

    if let Some(user_prompt) = guide.and_then(|g| g.user_prompt.as_deref()) {
        if !user_prompt.is_empty() {
            messages.push(ChatMessage::assistant(user_prompt));
        }
    }

    if let Some(guide) = guide {
        for example in select_examples(&guide.examples, n_shot, rng) {
            messages.extend(example.turns());
        }
    }

    messages
}

/// Holds the prompt guide and shot count of one inferencer, plus the random
/// source used for example sampling.
#[derive(Debug)]
pub struct PromptBuilder {
    guide: Option<PromptGuide>,
    n_shot: usize,
    rng: Mutex<StdRng>,
}

impl PromptBuilder {
    pub fn new(guide: Option<PromptGuide>, n_shot: usize) -> Self {
        PromptBuilder {
            guide,
            n_shot,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(guide: Option<PromptGuide>, n_shot: usize, seed: u64) -> Self {
        PromptBuilder {
            guide,
            n_shot,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn guide(&self) -> Option<&PromptGuide> {
        self.guide.as_ref()
    }

    pub fn n_shot(&self) -> usize {
        self.n_shot
    }

    pub fn build(&self, user_query: &str, context: &[SearchRecord]) -> Vec<ChatMessage> {
        // poisoning leaves the rng usable
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        generate_prompt(
            user_query,
            context,
            self.guide.as_ref(),
            self.n_shot,
            &mut *rng,
        )
    }
}
