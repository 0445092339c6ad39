use crate::error::{AppError, Context};
use crate::models::PostRow;
use crate::routes::ok_data;
use crate::services::FeaturedService;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use chrono::Utc;

/// Same post for everyone for the whole UTC day; `data: null` with no
/// active posts.
#[get("/plant-of-the-day")]
pub async fn plant_of_the_day(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let post = FeaturedService::plant_of_the_day(&state.db, Utc::now())
        .await
        .context("Failed to fetch plant of the day")?;
    Ok(ok_data(post.map(PostRow::into_view)))
}
