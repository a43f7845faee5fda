use serde::{Deserialize, Serialize};
use super::content::Content;
use super::tool::ToolCall;

/// One entry of a chat completion prompt, tagged by role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: Content },

    /// Instructions for reasoning deployments, which reject the `system` role
    Developer { content: Content },

    #[serde(rename = "user")]
    Human { content: Content },

    /// Either text or the tool calls the model asked for
    #[serde(rename = "assistant")]
    AI {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Content>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
    },

    /// Output of a tool call, matched by `tool_call_id`
    Tool {
        tool_call_id: String,
        content: Content,
    },
}

impl Message {
    pub fn system(content: impl Into<Content>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn developer(content: impl Into<Content>) -> Self {
        Self::Developer { content: content.into() }
    }

    pub fn human(content: impl Into<Content>) -> Self {
        Self::Human { content: content.into() }
    }

    pub fn ai(content: impl Into<Content>) -> Self {
        Self::AI {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// Assistant turn that only requests tool calls
    pub fn ai_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self::AI {
            content: None,
            tool_calls: Some(tool_calls),
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<Content>) -> Self {
        Self::Tool {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        }
    }

    /// Wire name of the role
    pub fn role(&self) -> &'static str {
        match self {
            Self::System { .. } => "system",
            Self::Developer { .. } => "developer",
            Self::Human { .. } => "user",
            Self::AI { .. } => "assistant",
            Self::Tool { .. } => "tool",
        }
    }

    /// Text content, if the message carries plain text
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::Developer { content } | Self::Human { content } => {
                content.as_text()
            }
            Self::AI { content, .. } => content.as_ref().and_then(Content::as_text),
            Self::Tool { content, .. } => content.as_text(),
        }
    }
}
