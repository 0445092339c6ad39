use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::user::UserSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Interest,
    NewMessage,
    NewPostCity,
    MatchFound,
    SwapComplete,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Interest => "interest",
            NotificationType::NewMessage => "new_message",
            NotificationType::NewPostCity => "new_post_city",
            NotificationType::MatchFound => "match_found",
            NotificationType::SwapComplete => "swap_complete",
        }
    }
}

impl FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interest" => Ok(NotificationType::Interest),
            "new_message" => Ok(NotificationType::NewMessage),
            "new_post_city" => Ok(NotificationType::NewPostCity),
            "match_found" => Ok(NotificationType::MatchFound),
            "swap_complete" => Ok(NotificationType::SwapComplete),
            other => Err(format!("unknown notification type: {other}")),
        }
    }
}

/// What a trigger wants delivered; see `NotificationService::create_and_emit`.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
    pub post_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
}

impl NotificationDraft {
    pub fn interest(owner_id: Uuid, sender_id: Uuid, sender_name: &str, plant_name: &str, post_id: Uuid) -> Self {
        Self {
            recipient_id: owner_id,
            sender_id,
            kind: NotificationType::Interest,
            title: "Someone is interested! 🌿".into(),
            body: format!("{sender_name} is interested in your {plant_name}"),
            post_id: Some(post_id),
            message_id: None,
        }
    }

    pub fn new_message(
        recipient_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        preview: &str,
        message_id: Uuid,
        post_id: Option<Uuid>,
    ) -> Self {
        Self {
            recipient_id,
            sender_id,
            kind: NotificationType::NewMessage,
            title: "New message 💬".into(),
            body: format!("{sender_name}: {preview}"),
            post_id,
            message_id: Some(message_id),
        }
    }

    pub fn new_post_city(
        recipient_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        plant_name: &str,
        city: &str,
        post_id: Uuid,
    ) -> Self {
        Self {
            recipient_id,
            sender_id,
            kind: NotificationType::NewPostCity,
            title: format!("New plant in {city} 🌱"),
            body: format!("{sender_name} just shared {plant_name}"),
            post_id: Some(post_id),
            message_id: None,
        }
    }

    pub fn swap_complete(
        recipient_id: Uuid,
        sender_id: Uuid,
        sender_name: &str,
        plant_name: &str,
        post_id: Uuid,
    ) -> Self {
        Self {
            recipient_id,
            sender_id,
            kind: NotificationType::SwapComplete,
            title: "Swap complete! 🎉".into(),
            body: format!("{sender_name} marked {plant_name} as swapped with you"),
            post_id: Some(post_id),
            message_id: None,
        }
    }

    /// Self-notifications are never delivered.
    pub fn is_self_addressed(&self) -> bool {
        self.recipient_id == self.sender_id
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub post_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub post_title: Option<String>,
    pub post_common_name: Option<String>,
    pub post_emoji: Option<String>,
    pub post_image_url: Option<String>,
}

/// Post summary embedded in a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPost {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub common_name: String,
    pub emoji: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub recipient: Uuid,
    pub sender: UserSummary,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub body: String,
    pub post_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    #[serde(default)]
    pub post: Option<NotificationPost>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl NotificationRow {
    pub fn into_notification(self) -> Notification {
        let post = match (self.post_id, self.post_title) {
            (Some(id), Some(title)) => Some(NotificationPost {
                id,
                title,
                common_name: self.post_common_name.unwrap_or_default(),
                emoji: self.post_emoji.unwrap_or_else(|| "🌿".into()),
                image_url: self.post_image_url,
            }),
            _ => None,
        };
        Notification {
            id: self.id,
            recipient: self.recipient_id,
            sender: UserSummary {
                id: self.sender_id,
                name: self.sender_name.unwrap_or_default(),
                avatar: self.sender_avatar,
                location: None,
            },
            kind: self
                .notification_type
                .parse()
                .unwrap_or(NotificationType::Interest),
            title: self.title,
            body: self.body,
            post_id: self.post_id,
            message_id: self.message_id,
            post,
            is_read: self.is_read,
            created_at: self.created_at,
        }
    }
}

/// Notification plus the duplicate `id` key clients read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: Uuid,
    #[serde(flatten)]
    pub notification: Notification,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            notification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trips_through_text() {
        for kind in [
            NotificationType::Interest,
            NotificationType::NewMessage,
            NotificationType::NewPostCity,
            NotificationType::MatchFound,
            NotificationType::SwapComplete,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationType>(), Ok(kind));
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }

    #[test]
    fn test_interest_draft_text() {
        let owner = Uuid::new_v4();
        let fan = Uuid::new_v4();
        let draft = NotificationDraft::interest(owner, fan, "Ravi", "Money Plant", Uuid::new_v4());
        assert_eq!(draft.title, "Someone is interested! 🌿");
        assert_eq!(draft.body, "Ravi is interested in your Money Plant");
        assert!(!draft.is_self_addressed());
    }

    #[test]
    fn test_row_without_post_has_no_summary() {
        let row = NotificationRow {
            id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            notification_type: "new_message".into(),
            title: "New message 💬".into(),
            body: "Ravi: hi".into(),
            post_id: None,
            message_id: Some(Uuid::new_v4()),
            is_read: false,
            created_at: Utc::now(),
            sender_name: Some("Ravi".into()),
            sender_avatar: None,
            post_title: None,
            post_common_name: None,
            post_emoji: None,
            post_image_url: None,
        };
        let notification = row.into_notification();
        assert_eq!(notification.kind, NotificationType::NewMessage);
        assert!(notification.post.is_none());

        let json = serde_json::to_value(NotificationView::from(notification)).unwrap();
        assert_eq!(json["type"], "new_message");
        assert_eq!(json["sender"]["name"], "Ravi");
        assert_eq!(json["id"], json["_id"]);
    }
}
