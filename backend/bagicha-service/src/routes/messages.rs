use crate::error::{AppError, Context};
use crate::middleware::User;
use crate::models::message::SendMessageRequest;
use crate::models::{MessageView, NewMessage, PageQuery};
use crate::routes::ok_data;
use crate::services::message_service::{DEFAULT_THREAD_LIMIT, MAX_THREAD_LIMIT};
use crate::services::MessageService;
use crate::state::AppState;
use actix_web::{get, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

#[get("/conversations")]
pub async fn get_conversations(
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, AppError> {
    let conversations = MessageService::conversations(&state.db, user.id)
        .await
        .context("Failed to fetch conversations.")?;
    Ok(ok_data(conversations))
}

#[post("")]
pub async fn send_message(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let new_message = NewMessage::build(user.id, req.recipient_id, req.content.as_deref(), req.post_id)
        .ok_or_else(|| AppError::BadRequest("recipientId and content are required.".into()))?;

    let message = MessageService::send(&state.db, &state.rooms, &new_message)
        .await
        .context("Failed to send message.")?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "data": MessageView::from(message),
    })))
}

/// Two-way thread with `user_id`, oldest first. Reading it marks what they
/// sent as read.
#[get("/{user_id}")]
pub async fn get_thread(
    state: web::Data<AppState>,
    user: User,
    other: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let other = other.into_inner();
    let (page, limit) = query.resolve(DEFAULT_THREAD_LIMIT, MAX_THREAD_LIMIT);

    let messages = MessageService::thread(&state.db, user.id, other, page, limit)
        .await
        .context("Failed to fetch messages.")?;

    match MessageService::mark_thread_read(&state.db, user.id, other).await {
        Ok(marked) if marked > 0 => {
            tracing::debug!(user_id = %user.id, %other, marked, "thread marked read")
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "failed to mark thread read"),
    }

    let messages: Vec<MessageView> = messages.into_iter().map(MessageView::from).collect();
    Ok(ok_data(messages))
}
