use super::*;

#[test]
fn log_is_immutable_per_turn() {
    let log = ConversationLog::new();
    assert!(log.is_empty());

    let extended = log.with_turn(Turn {
        question: "q1".to_string(),
        answer: "a1".to_string(),
    });

    assert!(log.is_empty());
    assert_eq!(extended.len(), 1);
    assert_eq!(extended.turns()[0].question, "q1");
}

#[test]
fn prompt_with_context_and_empty_history() {
    let log = ConversationLog::new();
    let context = ["Python, Go", "Rust"];

    let messages = assemble_prompt(None, &context, &log, "What languages do you know?");

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "system");
    assert!(messages[0].content.contains("Python, Go"));
    assert!(messages[0].content.contains("Rust"));
    assert_eq!(messages[1].role, "user");
    assert_eq!(messages[1].content, "What languages do you know?");
}

#[test]
fn prompt_includes_system_instruction_before_context() {
    let log = ConversationLog::new();
    let context = ["some chunk"];

    let messages = assemble_prompt(
        Some("You are a career assistant."),
        &context,
        &log,
        "question",
    );

    assert_eq!(messages[0].role, "system");
    let instruction_at = messages[0]
        .content
        .find("career assistant")
        .expect("instruction present");
    let context_at = messages[0].content.find("some chunk").expect("context present");
    assert!(instruction_at < context_at);
}

#[test]
fn prompt_interleaves_history_in_order() {
    let log = ConversationLog::new()
        .with_turn(Turn {
            question: "first question".to_string(),
            answer: "first answer".to_string(),
        })
        .with_turn(Turn {
            question: "second question".to_string(),
            answer: "second answer".to_string(),
        });

    let messages = assemble_prompt(None, &["ctx"], &log, "third question");

    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user", "assistant", "user"]);
    assert_eq!(messages[1].content, "first question");
    assert_eq!(messages[2].content, "first answer");
    assert_eq!(messages[5].content, "third question");
}

#[test]
fn prompt_without_context_or_instruction_has_no_system_message() {
    let log = ConversationLog::new();

    let messages = assemble_prompt(None, &[], &log, "question");

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, "user");
}
