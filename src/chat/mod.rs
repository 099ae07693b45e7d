
use anyhow::Result;
use console::style;
use dialoguer::Input;

use itertools::Itertools;

use crate::metadata::doc_type_or_unknown;
use crate::rag::{ConversationEngine, ConversationLog};
use crate::store::ScoredRecord;

/// How one line of user input is handled by the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplInput {
    Empty,
    Exit,
    Question(String),
}

pub(crate) fn classify_input(raw: &str) -> ReplInput {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        ReplInput::Empty
    } else if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
        ReplInput::Exit
    } else {
        ReplInput::Question(trimmed.to_string())
    }
}

/// Distinct categories of the retrieved context, in retrieval order
pub(crate) fn source_categories(sources: &[ScoredRecord]) -> Vec<String> {
    sources
        .iter()
        .map(|record| doc_type_or_unknown(record.doc_type.as_deref()).to_string())
        .unique()
        .collect()
}

/// Interactive chat loop over the knowledge base.
///
/// A failed turn is reported and does not enter the history, so the next
/// question is asked against the same conversation state.
#[inline]
pub async fn run_repl(engine: &ConversationEngine) -> Result<()> {
    eprintln!("{}", style("💬 Knowledge Base Chat").bold().cyan());
    eprintln!("Ask questions about your knowledge base. Type 'exit' or 'quit' to leave.");
    eprintln!();

    let mut log = ConversationLog::new();
    loop {
        let raw: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()?;

        let question = match classify_input(&raw) {
            ReplInput::Empty => continue,
            ReplInput::Exit => break,
            ReplInput::Question(question) => question,
        };

        match engine.answer(&question, &log).await {
            Ok(outcome) => {
                println!();
                println!("{} {}", style("Assistant:").bold().green(), outcome.answer);
                let categories = source_categories(&outcome.sources);
                if !categories.is_empty() {
                    println!("{}", style(format!("Sources: {}", categories.join(", "))).dim());
                }
                println!();
                log = outcome.log;
            }
            Err(e) => {
                eprintln!("{} {e}", style("⚠ Turn failed:").yellow());
            }
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}
