//! Persisted notifications and their realtime delivery.

use crate::error::AppResult;
use crate::models::notification::{
    Notification, NotificationDraft, NotificationRow, NotificationView,
};
use crate::websocket::{fanout, RoomRegistry, ServerEvent};
use sqlx::PgPool;
use uuid::Uuid;

/// Notifications returned by the inbox listing.
pub const INBOX_LIMIT: i64 = 30;

const NOTIFICATION_SELECT: &str = r#"
    SELECT n.id, n.recipient_id, n.sender_id, n.notification_type, n.title, n.body,
           n.post_id, n.message_id, n.is_read, n.created_at,
           s.name AS sender_name, s.avatar AS sender_avatar,
           p.title AS post_title, p.ai_analysis->>'commonName' AS post_common_name,
           p.ai_analysis->>'emoji' AS post_emoji, p.image_url AS post_image_url
    FROM notifications n
    LEFT JOIN users s ON s.id = n.sender_id
    LEFT JOIN posts p ON p.id = n.post_id"#;

#[derive(Debug, Clone)]
pub struct Inbox {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

pub struct NotificationService;

impl NotificationService {
    /// Persist `draft` and push it to the recipient's user room.
    ///
    /// Returns `None` when nothing was delivered: self-addressed drafts,
    /// recipients who opted out, or any failure. Failures are logged and
    /// never reach the caller.
    pub async fn create_and_emit(
        pool: &PgPool,
        rooms: &RoomRegistry,
        draft: NotificationDraft,
    ) -> Option<Notification> {
        if draft.is_self_addressed() {
            return None;
        }

        match Self::create(pool, &draft).await {
            Ok(Some(notification)) => {
                let targets = fanout::rooms_for_notification(&notification);
                rooms
                    .emit(
                        &targets,
                        &ServerEvent::NewNotification(Box::new(NotificationView::from(
                            notification.clone(),
                        ))),
                    )
                    .await;
                Some(notification)
            }
            Ok(None) => {
                tracing::debug!(
                    recipient_id = %draft.recipient_id,
                    kind = draft.kind.as_str(),
                    "notification skipped, recipient opted out or missing"
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    recipient_id = %draft.recipient_id,
                    kind = draft.kind.as_str(),
                    "failed to create notification"
                );
                None
            }
        }
    }

    /// Insert unless the recipient disabled notifications.
    async fn create(pool: &PgPool, draft: &NotificationDraft) -> AppResult<Option<Notification>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (id, recipient_id, sender_id, notification_type, title,
                                       body, post_id, message_id)
            SELECT $1, u.id, $3, $4, $5, $6, $7, $8
            FROM users u
            WHERE u.id = $2 AND u.notifications_enabled
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(draft.recipient_id)
        .bind(draft.sender_id)
        .bind(draft.kind.as_str())
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(draft.post_id)
        .bind(draft.message_id)
        .fetch_optional(pool)
        .await?;

        match id {
            Some(id) => Self::find(pool, id).await,
            None => Ok(None),
        }
    }

    async fn find(pool: &PgPool, id: Uuid) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "{NOTIFICATION_SELECT} WHERE n.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(NotificationRow::into_notification))
    }

    /// Fan `make(recipient)` out to many recipients, one at a time.
    pub async fn create_and_emit_many<F>(
        pool: &PgPool,
        rooms: &RoomRegistry,
        recipients: Vec<Uuid>,
        make: F,
    ) -> usize
    where
        F: Fn(Uuid) -> NotificationDraft,
    {
        let mut delivered = 0;
        for recipient in recipients {
            if Self::create_and_emit(pool, rooms, make(recipient)).await.is_some() {
                delivered += 1;
            }
        }
        delivered
    }

    pub async fn inbox(pool: &PgPool, recipient_id: Uuid) -> AppResult<Inbox> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "{NOTIFICATION_SELECT} WHERE n.recipient_id = $1 ORDER BY n.created_at DESC LIMIT $2"
        ))
        .bind(recipient_id)
        .bind(INBOX_LIMIT)
        .fetch_all(pool)
        .await?;

        let unread_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .fetch_one(pool)
        .await?;

        Ok(Inbox {
            notifications: rows.into_iter().map(NotificationRow::into_notification).collect(),
            unread_count,
        })
    }

    pub async fn mark_all_read(pool: &PgPool, recipient_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND NOT is_read",
        )
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Scoped to the recipient; other users' notifications are untouched.
    pub async fn mark_read(pool: &PgPool, id: Uuid, recipient_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: Uuid, recipient_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
