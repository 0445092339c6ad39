//! Target rooms for each kind of server-side mutation.

use super::Room;
use crate::models::{Message, Notification, PostView};
use uuid::Uuid;

/// `global`, plus the lowercase city room when the post has a city.
pub fn rooms_for_new_post(post: &PostView) -> Vec<Room> {
    let mut rooms = vec![Room::Global];
    rooms.extend(Room::city(&post.location.city));
    rooms
}

pub fn rooms_for_deleted_post() -> Vec<Room> {
    vec![Room::Global]
}

pub fn rooms_for_interest() -> Vec<Room> {
    vec![Room::Global]
}

/// Both participants' user rooms.
pub fn rooms_for_message(msg: &Message) -> Vec<Room> {
    rooms_for_participants(msg.sender_id, msg.recipient_id)
}

pub fn rooms_for_participants(a: Uuid, b: Uuid) -> Vec<Room> {
    if a == b {
        vec![Room::User(a)]
    } else {
        vec![Room::User(a), Room::User(b)]
    }
}

pub fn rooms_for_notification(notification: &Notification) -> Vec<Room> {
    vec![Room::User(notification.recipient)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_message_rooms() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = Message {
            id: Uuid::new_v4(),
            sender_id: a,
            recipient_id: b,
            content: "hi".into(),
            post_id: None,
            is_read: false,
            created_at: Utc::now(),
        };
        assert_eq!(rooms_for_message(&msg), vec![Room::User(a), Room::User(b)]);
        assert_eq!(rooms_for_participants(a, a), vec![Room::User(a)]);
    }

    #[test]
    fn test_notification_rooms() {
        use crate::models::notification::NotificationType;
        use crate::models::UserSummary;

        let recipient = Uuid::new_v4();
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient,
            sender: UserSummary {
                id: Uuid::new_v4(),
                name: "Ravi".into(),
                avatar: None,
                location: None,
            },
            kind: NotificationType::Interest,
            title: String::new(),
            body: String::new(),
            post_id: None,
            message_id: None,
            post: None,
            is_read: false,
            created_at: Utc::now(),
        };
        assert_eq!(rooms_for_notification(&notification), vec![Room::User(recipient)]);
    }
}
