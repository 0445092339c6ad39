use crate::models::{MessageView, NotificationView, PostView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events pushed from server to client.
///
/// Wire form is `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    NewPost(Box<PostView>),
    DeletePost(DeletePostPayload),
    PostInterest(PostInterestPayload),
    NewMessage(MessageView),
    MessageSent(MessageSentPayload),
    MessageRead(MessageReadPayload),
    NewNotification(Box<NotificationView>),
    Error(String),
    Pong,
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewPost(_) => "new_post",
            ServerEvent::DeletePost(_) => "delete_post",
            ServerEvent::PostInterest(_) => "post_interest",
            ServerEvent::NewMessage(_) => "new_message",
            ServerEvent::MessageSent(_) => "message_sent",
            ServerEvent::MessageRead(_) => "message_read",
            ServerEvent::NewNotification(_) => "new_notification",
            ServerEvent::Error(_) => "error",
            ServerEvent::Pong => "pong",
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePostPayload {
    pub post_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestedBy {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInterestPayload {
    pub post_id: Uuid,
    pub interested_count: i32,
    pub interested_by: InterestedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSentPayload {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadPayload {
    pub message_id: Uuid,
    pub is_read: bool,
}
