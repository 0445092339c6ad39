use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub post_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The other side of the conversation as seen by `user_id`.
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if self.sender_id == user_id {
            Some(self.recipient_id)
        } else if self.recipient_id == user_id {
            Some(self.sender_id)
        } else {
            None
        }
    }

    /// First `n` characters of the content.
    pub fn preview(&self, n: usize) -> String {
        self.content.chars().take(n).collect()
    }
}

/// Message plus the duplicate `id` key clients read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: Uuid,
    #[serde(flatten)]
    pub message: Message,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            message,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Option<Uuid>,
    pub content: Option<String>,
    pub post_id: Option<Uuid>,
}

/// A validated message ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub content: String,
    pub post_id: Option<Uuid>,
}

impl NewMessage {
    /// `None` when the recipient is missing or the content is blank.
    pub fn build(
        sender_id: Uuid,
        recipient_id: Option<Uuid>,
        content: Option<&str>,
        post_id: Option<Uuid>,
    ) -> Option<Self> {
        let recipient_id = recipient_id?;
        let content = content.map(str::trim).filter(|c| !c.is_empty())?;
        Some(Self {
            sender_id,
            recipient_id,
            content: content.to_string(),
            post_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_profile_picture: Option<String>,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: i64,
}
