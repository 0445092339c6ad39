use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events sent by clients over the socket.
///
/// Wire form is `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join the caller's own user room.
    UserConnected(Uuid),
    /// Alias of `UserConnected`.
    JoinUserRoom(Uuid),
    /// Join a named room and `global`.
    JoinRoom(String),
    LeaveRoom(String),
    SendMessage(SendMessagePayload),
    /// Mark a received message read.
    MarkRead(Uuid),
    Ping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(default)]
    pub recipient_id: Option<Uuid>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub post_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inbound_events() {
        let id = Uuid::new_v4();
        let evt: ClientEvent =
            serde_json::from_str(&format!(r#"{{"event":"user_connected","data":"{id}"}}"#)).unwrap();
        assert_eq!(evt, ClientEvent::UserConnected(id));

        let evt: ClientEvent = serde_json::from_str(r#"{"event":"join_room","data":"pune"}"#).unwrap();
        assert_eq!(evt, ClientEvent::JoinRoom("pune".into()));

        let evt: ClientEvent = serde_json::from_str(r#"{"event":"ping"}"#).unwrap();
        assert_eq!(evt, ClientEvent::Ping);

        let evt: ClientEvent =
            serde_json::from_str(r#"{"event":"send_message","data":{"content":"hi"}}"#).unwrap();
        assert_eq!(
            evt,
            ClientEvent::SendMessage(SendMessagePayload {
                content: Some("hi".into()),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"typing","data":{}}"#).is_err());
    }
}
