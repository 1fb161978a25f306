use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskdeckError};

pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_CHAT_TITLE_LENGTH: usize = 255;

/// A conversation container. Created empty; messages accumulate in
/// insertion order and are deleted with the chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A single turn in a chat. Immutable once created; `is_bot`
/// distinguishes agent replies from user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub message: String,
    pub is_bot: bool,
    pub created_at: DateTime<Utc>,
}

/// A chat with its messages in creation order.
#[derive(Debug, Clone, Serialize)]
pub struct ChatDetail {
    #[serde(flatten)]
    pub chat: Chat,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatInput {
    #[serde(default)]
    pub title: Option<String>,
}

pub fn validate_chat_input(input: &ChatInput) -> Result<()> {
    if let Some(ref title) = input.title {
        if title.len() > MAX_CHAT_TITLE_LENGTH {
            return Err(TaskdeckError::InvalidInput(format!(
                "title exceeds maximum length of {MAX_CHAT_TITLE_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

pub fn validate_message(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(TaskdeckError::InvalidInput("message is required".into()));
    }
    if text.len() > MAX_MESSAGE_LENGTH {
        return Err(TaskdeckError::InvalidInput(format!(
            "message is too long (max {MAX_MESSAGE_LENGTH} characters)"
        )));
    }
    Ok(())
}
