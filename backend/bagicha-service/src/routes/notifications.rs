use crate::error::{AppError, Context};
use crate::middleware::User;
use crate::models::NotificationView;
use crate::routes::ok_data;
use crate::services::NotificationService;
use crate::state::AppState;
use actix_web::{delete, get, patch, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

#[get("")]
pub async fn get_notifications(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let inbox = NotificationService::inbox(&state.db, user.id)
        .await
        .context("Failed to fetch notifications.")?;
    let notifications: Vec<NotificationView> = inbox
        .notifications
        .into_iter()
        .map(NotificationView::from)
        .collect();

    Ok(ok_data(json!({
        "notifications": notifications,
        "unreadCount": inbox.unread_count,
    })))
}

#[patch("/read-all")]
pub async fn mark_all_read(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    NotificationService::mark_all_read(&state.db, user.id)
        .await
        .context("Failed to mark notifications as read.")?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "All notifications marked as read.",
    })))
}

/// Scoped to the caller; ids that match nothing still succeed so clients can
/// drop items optimistically.
#[patch("/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    user: User,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let found = NotificationService::mark_read(&state.db, *id, user.id)
        .await
        .context("Failed to mark as read.")?;
    if !found {
        tracing::debug!(notification_id = %id, user_id = %user.id, "mark read matched nothing");
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

#[delete("/{id}")]
pub async fn delete_notification(
    state: web::Data<AppState>,
    user: User,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let found = NotificationService::delete(&state.db, *id, user.id)
        .await
        .context("Failed to delete notification.")?;
    if !found {
        tracing::debug!(notification_id = %id, user_id = %user.id, "delete matched nothing");
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}
