//! Prompt assembly: system instruction + history + the user's message.
//!
//! The output shape is fixed: exactly one system message first, then
//! prior turns oldest-first, then the incoming user message last. The
//! incoming message must not already be present in `history` — the
//! caller reads history *before* persisting the new turn.

use crate::models::{ChatMessage, ConversationTurn, Role};

const SEPARATOR: &str = "\n---\n";

const GROUNDED_INSTRUCTION: &str = "You are a helpful assistant. Answer using the provided \
     context when it is relevant. If the context does not contain the answer, say so instead \
     of guessing.\n\nContext:\n";

const UNGROUNDED_INSTRUCTION: &str =
    "You are a helpful assistant. No reference material was found for this question; answer \
     from general knowledge and say when you are unsure.";

/// Build the message list for a generation call.
pub fn assemble(
    history: &[ConversationTurn],
    retrieved: &[String],
    user_text: &str,
) -> Vec<ChatMessage> {
    let system = if retrieved.is_empty() {
        UNGROUNDED_INSTRUCTION.to_string()
    } else {
        format!("{}{}", GROUNDED_INSTRUCTION, retrieved.join(SEPARATOR))
    };

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new(Role::System, &system));
    for turn in history {
        messages.push(ChatMessage::new(turn.role, &turn.content));
    }
    messages.push(ChatMessage::new(Role::User, user_text));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            user_id: 1,
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn shape_is_system_history_user() {
        let history = vec![
            turn(Role::User, "earlier question"),
            turn(Role::Assistant, "earlier answer"),
        ];
        let retrieved = vec!["chunk one".to_string(), "chunk two".to_string()];

        let messages = assemble(&history, &retrieved, "new question");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[3].role, Role::User);
        assert_eq!(messages[3].content, "new question");
    }

    #[test]
    fn chunks_join_with_separator() {
        let retrieved = vec!["first".to_string(), "second".to_string()];
        let messages = assemble(&[], &retrieved, "q");
        assert!(messages[0].content.contains("first\n---\nsecond"));
    }

    #[test]
    fn empty_retrieval_still_yields_one_system_message() {
        let messages = assemble(&[], &[], "q");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(!messages[0].content.contains("Context:"));
        assert_eq!(messages[1].content, "q");
    }

    #[test]
    fn incoming_message_appears_exactly_once() {
        // History was read before the new turn was persisted, so the
        // incoming text shows up only as the final message.
        let history = vec![turn(Role::User, "old"), turn(Role::Assistant, "reply")];
        let messages = assemble(&history, &[], "fresh");
        let count = messages.iter().filter(|m| m.content == "fresh").count();
        assert_eq!(count, 1);
        assert_eq!(messages.last().unwrap().content, "fresh");
    }
}
