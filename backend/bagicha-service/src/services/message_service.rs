use crate::error::AppResult;
use crate::models::message::{ConversationSummary, Message, MessageView, NewMessage};
use crate::models::notification::NotificationDraft;
use crate::services::notification_service::NotificationService;
use crate::services::user_service::UserService;
use crate::websocket::{fanout, RoomRegistry, ServerEvent};
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_THREAD_LIMIT: i64 = 50;
pub const MAX_THREAD_LIMIT: i64 = 200;
/// Characters of the message quoted in its notification.
pub const NOTIFICATION_PREVIEW_CHARS: usize = 80;

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, content, post_id, is_read, created_at";

pub struct MessageService;

impl MessageService {
    pub async fn create(pool: &PgPool, new_message: &NewMessage) -> AppResult<Message> {
        let message = sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, content, post_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_message.sender_id)
        .bind(new_message.recipient_id)
        .bind(&new_message.content)
        .bind(new_message.post_id)
        .fetch_one(pool)
        .await?;

        tracing::debug!(
            message_id = %message.id,
            sender_id = %message.sender_id,
            recipient_id = %message.recipient_id,
            "message stored"
        );
        Ok(message)
    }

    /// Push `new_message` to both participants' rooms.
    pub async fn broadcast(rooms: &RoomRegistry, message: &Message) -> usize {
        rooms
            .emit(
                &fanout::rooms_for_message(message),
                &ServerEvent::NewMessage(MessageView::from(message.clone())),
            )
            .await
    }

    /// Persist, broadcast, and notify the recipient.
    pub async fn send(
        pool: &PgPool,
        rooms: &RoomRegistry,
        new_message: &NewMessage,
    ) -> AppResult<Message> {
        let message = Self::create(pool, new_message).await?;
        Self::broadcast(rooms, &message).await;

        let sender_name = match UserService::summary(pool, message.sender_id).await {
            Ok(Some(sender)) => sender.name,
            Ok(None) => "Someone".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "sender lookup failed for message notification");
                "Someone".to_string()
            }
        };
        NotificationService::create_and_emit(
            pool,
            rooms,
            NotificationDraft::new_message(
                message.recipient_id,
                message.sender_id,
                &sender_name,
                &message.preview(NOTIFICATION_PREVIEW_CHARS),
                message.id,
                message.post_id,
            ),
        )
        .await;

        Ok(message)
    }

    /// Both directions between `me` and `other`, oldest first.
    pub async fn thread(
        pool: &PgPool,
        me: Uuid,
        other: Uuid,
        page: i64,
        limit: i64,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE (sender_id = $1 AND recipient_id = $2)
               OR (sender_id = $2 AND recipient_id = $1)
            ORDER BY created_at ASC, id ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(me)
        .bind(other)
        .bind(limit)
        .bind(crate::models::offset(page, limit))
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    /// Mark everything `other` sent to `me` as read.
    pub async fn mark_thread_read(pool: &PgPool, me: Uuid, other: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE WHERE recipient_id = $1 AND sender_id = $2 AND NOT is_read",
        )
        .bind(me)
        .bind(other)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark one message read. Only its recipient may; anyone else gets `None`.
    pub async fn mark_read(pool: &PgPool, id: Uuid, reader: Uuid) -> AppResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!(
            "UPDATE messages SET is_read = TRUE WHERE id = $1 AND recipient_id = $2 RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(id)
        .bind(reader)
        .fetch_optional(pool)
        .await?;
        Ok(message)
    }

    /// One row per counterpart, newest conversation first.
    pub async fn conversations(pool: &PgPool, me: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationSummary>(
            r#"
            WITH mine AS (
                SELECT CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END AS other_id,
                       content, created_at,
                       (recipient_id = $1 AND NOT is_read) AS unread
                FROM messages
                WHERE sender_id = $1 OR recipient_id = $1
            ),
            ranked AS (
                SELECT other_id, content, created_at,
                       ROW_NUMBER() OVER (PARTITION BY other_id ORDER BY created_at DESC) AS rn,
                       COUNT(*) FILTER (WHERE unread) OVER (PARTITION BY other_id) AS unread_count
                FROM mine
            )
            SELECT r.other_id AS user_id,
                   u.name AS user_name,
                   u.avatar AS user_profile_picture,
                   r.content AS last_message,
                   r.created_at AS last_message_time,
                   r.unread_count
            FROM ranked r
            JOIN users u ON u.id = r.other_id
            WHERE r.rn = 1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(me)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
