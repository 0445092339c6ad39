use crate::error::{AppError, Context};
use crate::models::{offset, PageQuery, PostRow, PostType};
use crate::routes::{non_blank, ok_data};
use crate::services::{PostService, UserService};
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const DEFAULT_PROFILE_POSTS: i64 = 12;
const MAX_PROFILE_POSTS: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct UserPostsQuery {
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub city: Option<String>,
}

#[get("/leaderboard/swappers")]
pub async fn leaderboard(
    state: web::Data<AppState>,
    query: web::Query<LeaderboardQuery>,
) -> Result<HttpResponse, AppError> {
    let entries = UserService::leaderboard(&state.db, non_blank(query.city.as_deref()))
        .await
        .context("Failed to fetch leaderboard.")?;
    Ok(ok_data(entries))
}

#[get("/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user = UserService::find_by_id(&state.db, *id)
        .await
        .context("Failed to fetch user.")?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;
    Ok(ok_data(user.to_profile()))
}

#[get("/{id}/posts")]
pub async fn get_user_posts(
    state: web::Data<AppState>,
    id: web::Path<Uuid>,
    query: web::Query<UserPostsQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve(DEFAULT_PROFILE_POSTS, MAX_PROFILE_POSTS);
    let post_type = query.post_type.as_deref().and_then(|t| t.parse::<PostType>().ok());

    let (rows, total) = PostService::list_by_user(&state.db, *id, post_type, page, limit)
        .await
        .context("Failed to fetch posts.")?;
    let has_more = offset(page, limit) + (rows.len() as i64) < total;
    let posts: Vec<_> = rows.into_iter().map(PostRow::into_view).collect();

    Ok(ok_data(json!({
        "posts": posts,
        "pagination": { "total": total, "page": page, "hasMore": has_more },
    })))
}
