use crate::error::{AppError, AppResult, Context};
use crate::middleware::User;
use crate::models::location::{display_name, valid_coordinates};
use crate::models::post::{CreatePostRequest, MarkSwappedRequest, PostType, UpdatePostRequest};
use crate::models::{NotificationDraft, PageQuery, Pagination, PostRow, WeatherSnapshot};
use crate::routes::{non_blank, ok_data, ok_message};
use crate::services::post_service::{FeedFilter, FeedQuery, NewPost, PostUpdate, MAX_FEED_LIMIT};
use crate::services::{NotificationService, PostService, UserService};
use crate::state::AppState;
use crate::websocket::events::{DeletePostPayload, InterestedBy, PostInterestPayload};
use crate::websocket::{fanout, ServerEvent};
use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

/// Cap on `new_post_city` notifications per post.
const CITY_NOTIFY_LIMIT: i64 = 50;
const MAX_DESCRIPTION_CHARS: usize = 500;

async fn owned_post(state: &AppState, id: Uuid, user: User, forbidden: &str) -> AppResult<PostRow> {
    let post = PostService::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found.".into()))?;
    if post.user_id != user.id {
        return Err(AppError::Forbidden(forbidden.into()));
    }
    Ok(post)
}

#[get("")]
pub async fn get_feed(
    state: web::Data<AppState>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = FeedFilter::from_query(&query);
    let page = PostService::feed(&state.db, &filter)
        .await
        .context("Failed to fetch posts.")?;
    Ok(ok_data(json!({ "posts": page.posts, "pagination": page.pagination })))
}

#[post("")]
pub async fn create_post(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let post_type = req
        .post_type
        .as_deref()
        .and_then(|t| t.parse::<PostType>().ok())
        .ok_or_else(|| AppError::Validation("Post type must be 'available' or 'wanted'.".into()))?;

    let description = req.description.as_deref().map(str::trim).unwrap_or_default();
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::Validation(
            "Description cannot exceed 500 characters.".into(),
        ));
    }

    let city = non_blank(req.city.as_deref()).unwrap_or_default().to_string();
    let country = non_blank(req.country.as_deref()).unwrap_or_default().to_string();
    let coordinates = match (req.lat, req.lon) {
        (Some(lat), Some(lon)) if valid_coordinates(lat, lon) => Some((lat, lon)),
        _ => None,
    };
    let weather_snapshot = match coordinates {
        Some((lat, lon)) => state.weather.current(lat, lon).await.snapshot(),
        None => WeatherSnapshot::default(),
    };
    let (latitude, longitude) = coordinates.unwrap_or((0.0, 0.0));

    let new_post = NewPost {
        user_id: user.id,
        post_type,
        title: req.resolved_title(),
        description: description.to_string(),
        image_url: non_blank(req.image_url.as_deref()).map(str::to_string),
        tags: req.resolved_tags(),
        ai_analysis: req.ai_analysis.clone().unwrap_or_default(),
        weather_snapshot,
        display_name: display_name(&city, &country),
        country_code: non_blank(req.country_code.as_deref())
            .unwrap_or_default()
            .to_uppercase(),
        city,
        country,
        latitude,
        longitude,
    };

    let row = async {
        let row = PostService::create(&state.db, new_post).await?;
        UserService::adjust_post_count(&state.db, user.id, 1).await?;
        Ok::<_, AppError>(row)
    }
    .await
    .context("Failed to create post.")?;

    let post_id = row.id;
    let author_name = row.author_name.clone().unwrap_or_default();
    let plant_name = row.ai_analysis.plant_name(&row.title).to_string();
    let view = row.into_view();

    state
        .rooms
        .emit(
            &fanout::rooms_for_new_post(&view),
            &ServerEvent::NewPost(Box::new(view.clone())),
        )
        .await;

    if !view.location.city.is_empty() {
        notify_city(&state, user.id, &author_name, &plant_name, &view.location.city, post_id).await;
    }

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Post created! 🌿",
        "data": view,
    })))
}

async fn notify_city(
    state: &AppState,
    author_id: Uuid,
    author_name: &str,
    plant_name: &str,
    city: &str,
    post_id: Uuid,
) {
    let recipients =
        match UserService::ids_in_city(&state.db, city, author_id, CITY_NOTIFY_LIMIT).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, city, "city notification lookup failed");
                return;
            }
        };

    let delivered = NotificationService::create_and_emit_many(
        &state.db,
        &state.rooms,
        recipients,
        |recipient| {
            NotificationDraft::new_post_city(
                recipient,
                author_id,
                author_name,
                plant_name,
                city,
                post_id,
            )
        },
    )
    .await;
    tracing::debug!(%post_id, city, delivered, "city notifications sent");
}

#[get("/user/{user_id}")]
pub async fn get_user_posts(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
    let (page, limit) = query.resolve(MAX_FEED_LIMIT, MAX_FEED_LIMIT);
    let (rows, total) = PostService::list_by_user(&state.db, *user_id, None, page, limit)
        .await
        .context("Failed to fetch user posts.")?;
    let pagination = Pagination::new(total, page, limit, rows.len());
    let posts: Vec<_> = rows.into_iter().map(PostRow::into_view).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": posts,
        "pagination": pagination,
    })))
}

#[get("/{id}")]
pub async fn get_post(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let post = PostService::find_active(&state.db, *id)
        .await
        .context("Failed to fetch post.")?
        .ok_or_else(|| AppError::NotFound("Post not found.".into()))?;
    Ok(ok_data(post.into_view()))
}

#[patch("/{id}")]
pub async fn update_post(
    state: web::Data<AppState>,
    user: User,
    id: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    owned_post(&state, id, user, "You can only edit your own posts.")
        .await
        .context("Failed to update post.")?;

    let update = PostUpdate::from_request(body.into_inner())?;
    let post = PostService::update(&state.db, id, &update)
        .await
        .context("Failed to update post.")?
        .ok_or_else(|| AppError::NotFound("Post not found.".into()))?;
    Ok(ok_message("Post updated.", post.into_view()))
}

#[delete("/{id}")]
pub async fn delete_post(
    state: web::Data<AppState>,
    user: User,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    async {
        owned_post(&state, id, user, "You can only delete your own posts.").await?;
        if PostService::delete(&state.db, id).await? {
            UserService::adjust_post_count(&state.db, user.id, -1).await?;
        }
        Ok::<_, AppError>(())
    }
    .await
    .context("Failed to delete post.")?;

    tracing::info!(post_id = %id, user_id = %user.id, "post deleted");
    state
        .rooms
        .emit(
            &fanout::rooms_for_deleted_post(),
            &ServerEvent::DeletePost(DeletePostPayload { post_id: id }),
        )
        .await;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Post deleted." })))
}

#[post("/{id}/interest")]
pub async fn toggle_interest(
    state: web::Data<AppState>,
    user: User,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let post_id = id.into_inner();
    let toggle = PostService::toggle_interest(&state.db, post_id, user.id)
        .await
        .context("Failed to update interest.")?
        .ok_or_else(|| AppError::NotFound("Post not found.".into()))?;

    if toggle.is_interested {
        let name = match UserService::summary(&state.db, user.id).await {
            Ok(Some(summary)) => summary.name,
            Ok(None) => "Someone".to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "interest sender lookup failed");
                "Someone".to_string()
            }
        };

        state
            .rooms
            .emit(
                &fanout::rooms_for_interest(),
                &ServerEvent::PostInterest(PostInterestPayload {
                    post_id,
                    interested_count: toggle.interested_count,
                    interested_by: InterestedBy {
                        id: user.id,
                        name: name.clone(),
                    },
                }),
            )
            .await;

        NotificationService::create_and_emit(
            &state.db,
            &state.rooms,
            NotificationDraft::interest(
                toggle.owner_id,
                user.id,
                &name,
                &toggle.plant_name(),
                post_id,
            ),
        )
        .await;
    }

    let message = if toggle.is_interested {
        "Interest noted! 🌱"
    } else {
        "Interest removed."
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "isInterested": toggle.is_interested,
        "interestedCount": toggle.interested_count,
    })))
}

#[patch("/{id}/mark-swapped")]
pub async fn mark_swapped(
    state: web::Data<AppState>,
    user: User,
    id: web::Path<Uuid>,
    body: Option<web::Json<MarkSwappedRequest>>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let swapped_with = body.and_then(|b| b.into_inner().swapped_with_user_id);

    let post = async {
        owned_post(&state, id, user, "Not authorized.").await?;
        let post = PostService::mark_swapped(&state.db, id, swapped_with)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found.".into()))?;
        UserService::increment_swaps(&state.db, user.id).await?;
        Ok::<_, AppError>(post)
    }
    .await
    .context("Failed to mark as swapped.")?;

    if let Some(partner) = swapped_with {
        let owner_name = post.author_name.clone().unwrap_or_default();
        NotificationService::create_and_emit(
            &state.db,
            &state.rooms,
            NotificationDraft::swap_complete(
                partner,
                user.id,
                &owner_name,
                post.ai_analysis.plant_name(&post.title),
                id,
            ),
        )
        .await;
    }

    Ok(ok_message("Marked as swapped! 🎉", post.into_view()))
}
