use colloquy_llm::{Content, Message};
use colloquy_persist::{Message as StoredMessage, MessageRole};

use crate::dispatcher::ModelType;
use crate::rag::Citation;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly AI assistant. \
You must always return in markdown format.";

/// Prepended to instructions for reasoning deployments, which otherwise answer in plain text
pub const REASONING_PREAMBLE: &str =
    "Formatting re-enabled - please enclose code blocks with appropriate markdown tags.\n\n";

pub const MULTIMODAL_INSTRUCTION: &str = "\n You are an expert in extracting insights from images \
that are uploaded to the chat. \n You will answer questions about the image that is provided.";

/// Default prompt followed by the thread persona
pub fn persona_prompt(persona_message: &str) -> String {
    format!("{} \n\n {}", DEFAULT_SYSTEM_PROMPT, persona_message)
}

/// Instruction message in the role the model type expects
pub fn instructions(model_type: ModelType, text: &str) -> Message {
    match model_type {
        ModelType::Standard => Message::system(text),
        ModelType::Reasoning => Message::developer(format!("{}{}", REASONING_PREAMBLE, text)),
    }
}

/// Stored history as model messages; function records stay out of the prompt
pub fn history_messages(history: &[StoredMessage]) -> Vec<Message> {
    history
        .iter()
        .filter_map(|message| match message.role {
            MessageRole::User => Some(Message::human(message.content.as_str())),
            MessageRole::Assistant => Some(Message::ai(message.content.as_str())),
            MessageRole::System => Some(Message::system(message.content.as_str())),
            MessageRole::Function | MessageRole::Tool => None,
        })
        .collect()
}

/// User turn carrying a text part and the attached image
pub fn multimodal_message(text: &str, image_data_url: &str) -> Message {
    Message::human(Content::text_with_image(text, image_data_url))
}

/// User turn augmented with retrieved document content
pub fn rag_user_message(citations: &[Citation], question: &str) -> String {
    let content = citations
        .iter()
        .enumerate()
        .map(|(index, citation)| {
            format!(
                "[{}]. file name: {} \n file id: {} \n {}",
                index, citation.name, citation.id, citation.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n------\n");

    format!(
        "\n
- Review the following content from documents uploaded by the user and create a final answer.
- If you don't know the answer, just say that you don't know. Don't try to make up an answer.
- You must always include a citation at the end of your answer and don't include full stop after the citations.
- Use the format for your citation {{% citation items=[{{name:\"filename 1\",id:\"file id\"}}, {{name:\"filename 2\",id:\"file id\"}}] /%}}
----------------
content:
{}
\n
---------------- \n
question:
{}
",
        content, question
    )
}

/// Thread title derived from the first user message
pub fn thread_title(message: &str) -> String {
    const MAX_CHARS: usize = 40;
    let trimmed = message.trim();
    let mut title: String = trimmed.chars().take(MAX_CHARS).collect();
    if trimmed.chars().count() > MAX_CHARS {
        title.push_str("...");
    }
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_uses_developer_role_and_preamble() {
        let message = instructions(ModelType::Reasoning, "Be brief.");
        assert_eq!(message.role(), "developer");
        match message {
            Message::Developer { content } => {
                let text = content.as_text().unwrap();
                assert!(text.starts_with(REASONING_PREAMBLE));
                assert!(text.ends_with("Be brief."));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_standard_uses_system_role() {
        assert_eq!(instructions(ModelType::Standard, "x").role(), "system");
    }

    #[test]
    fn test_history_skips_function_records() {
        let history = vec![
            StoredMessage::new("t", "u", MessageRole::User, "hi"),
            StoredMessage::new("t", "u", MessageRole::Function, "{}").with_name("lookup"),
            StoredMessage::new("t", "u", MessageRole::Assistant, "hello"),
        ];
        let messages = history_messages(&history);
        let roles: Vec<&str> = messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["user", "assistant"]);
    }

    #[test]
    fn test_rag_message_lists_citations() {
        let citations = vec![Citation {
            id: "c1".to_string(),
            name: "notes.txt".to_string(),
            content: "The sky is blue.".to_string(),
        }];
        let prompt = rag_user_message(&citations, "What colour is the sky?");
        assert!(prompt.contains("[0]. file name: notes.txt \n file id: c1 \n The sky is blue."));
        assert!(prompt.contains("{% citation items=[{name:\"filename 1\""));
        assert!(prompt.ends_with("question:\nWhat colour is the sky?\n"));
    }

    #[test]
    fn test_thread_title_truncates() {
        assert_eq!(thread_title("  short  "), "short");
        let long = "a".repeat(50);
        assert_eq!(thread_title(&long), format!("{}...", "a".repeat(40)));
    }
}
