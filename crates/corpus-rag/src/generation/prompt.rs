//! Prompt templates and message assembly

use crate::types::ChatMessage;

/// Builds the system/user messages for a grounded chat turn
pub struct PromptBuilder;

impl PromptBuilder {
    /// System prompt instructing bracket citations
    pub fn system_prompt() -> String {
        [
            "You are a retrieval-grounded question answering assistant.",
            "Cite evidence inline using bracket citations of the form [<title> p.<page>].",
            "When the evidence is insufficient, say the answer is an estimate and name the information that is missing.",
            "Avoid needless verbosity; prefer itemized answers.",
        ]
        .join("\n")
    }

    /// User turn combining the question with the retrieved context
    pub fn user_prompt(message: &str, context: &str) -> String {
        format!(
            "Question: {}\n\nThe following is the retrieved context:\n{}",
            message, context
        )
    }

    /// Full message list: system prompt, compacted history, user turn
    pub fn build_messages(
        message: &str,
        context: &str,
        history: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(Self::system_prompt()));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(Self::user_prompt(message, context)));
        messages
    }

    /// Keep only the most recent `max_turns` exchanges, oldest dropped first
    pub fn compact_history(history: &[ChatMessage], max_turns: usize) -> Vec<ChatMessage> {
        let cap = max_turns * 2;
        if history.len() <= cap {
            history.to_vec()
        } else {
            history[history.len() - cap..].to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_order_is_system_history_user() {
        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];
        let messages = PromptBuilder::build_messages("new question", "ctx", &history);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].content, "earlier answer");
        assert_eq!(messages[3].role, "user");
        assert!(messages[3].content.contains("new question"));
        assert!(messages[3].content.contains("ctx"));
    }

    #[test]
    fn history_compaction_drops_oldest_first() {
        let history: Vec<ChatMessage> = (0..10)
            .map(|i| ChatMessage::user(format!("turn {}", i)))
            .collect();
        let compact = PromptBuilder::compact_history(&history, 2);
        assert_eq!(compact.len(), 4);
        assert_eq!(compact[0].content, "turn 6");
        assert_eq!(compact[3].content, "turn 9");
    }

    #[test]
    fn short_history_is_untouched() {
        let history = vec![ChatMessage::user("only turn")];
        let compact = PromptBuilder::compact_history(&history, 8);
        assert_eq!(compact.len(), 1);
    }
}
