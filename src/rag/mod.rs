// Conversational retrieval module
// Explicit embed -> search -> assemble -> complete contract over the store

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::config::Config;
use crate::providers::{ChatMessage, OpenAiClient};
use crate::store::{ScoredRecord, VectorStore};
use crate::Result;

/// One completed question/answer exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Ordered conversation history, owned by the caller.
///
/// A log is never mutated in place by the engine: a successful answer
/// returns a new log with the turn appended, and a failed answer leaves the
/// caller's log untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationLog {
    turns: Vec<Turn>,
}

impl ConversationLog {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// A new log with `turn` appended
    #[inline]
    pub fn with_turn(&self, turn: Turn) -> Self {
        let mut turns = self.turns.clone();
        turns.push(turn);
        Self { turns }
    }
}

/// Result of one answered question
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOutcome {
    pub answer: String,
    pub log: ConversationLog,
    pub sources: Vec<ScoredRecord>,
}

/// Retrieval-augmented question answering over a vector store
pub struct ConversationEngine {
    client: OpenAiClient,
    store: VectorStore,
    top_k: usize,
    temperature: f32,
    system_prompt: Option<String>,
}

impl ConversationEngine {
    #[inline]
    pub fn new(client: OpenAiClient, store: VectorStore, config: &Config) -> Self {
        Self {
            client,
            store,
            top_k: config.retrieval.top_k,
            temperature: config.openai.temperature,
            system_prompt: config.retrieval.system_prompt.clone(),
        }
    }

    /// Answer a question using retrieved context and the conversation so far.
    ///
    /// `top_k` bounds context breadth, trading recall against prompt length;
    /// the temperature trades determinism for diversity of phrasing. On any
    /// provider or store failure the error propagates and `log` is unchanged.
    #[inline]
    pub async fn answer(&self, question: &str, log: &ConversationLog) -> Result<ChatOutcome> {
        let query_vector = self.client.embed(question)?;
        let sources = self.store.search(&query_vector, self.top_k).await?;
        debug!(
            "Retrieved {} context chunks for question ({} prior turns)",
            sources.len(),
            log.len()
        );

        let context: Vec<&str> = sources.iter().map(|r| r.content.as_str()).collect();
        let messages = assemble_prompt(self.system_prompt.as_deref(), &context, log, question);

        let answer = self.client.complete(&messages, self.temperature)?;

        let log = log.with_turn(Turn {
            question: question.to_string(),
            answer: answer.clone(),
        });

        Ok(ChatOutcome {
            answer,
            log,
            sources,
        })
    }
}

/// Assemble the chat prompt: optional system instruction plus retrieved
/// context, then the history as alternating user/assistant messages, then
/// the new question. Pure function, independently testable.
#[inline]
pub fn assemble_prompt(
    system_instruction: Option<&str>,
    context_chunks: &[&str],
    log: &ConversationLog,
    question: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(log.len() * 2 + 2);

    let mut system = system_instruction.unwrap_or_default().to_string();
    if !context_chunks.is_empty() {
        if !system.is_empty() {
            system.push_str("\n\n");
        }
        system.push_str(
            "Use the following context from the knowledge base to answer the question:\n\n",
        );
        system.push_str(&context_chunks.join("\n\n---\n\n"));
    }
    if !system.is_empty() {
        messages.push(ChatMessage::system(system));
    }

    for turn in log.turns() {
        messages.push(ChatMessage::user(turn.question.clone()));
        messages.push(ChatMessage::assistant(turn.answer.clone()));
    }

    messages.push(ChatMessage::user(question));
    messages
}
