use crate::error::AppResult;
use crate::models::PostRow;
use crate::services::post_service::PostService;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole UTC days since the Unix epoch.
pub fn day_seed(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(SECONDS_PER_DAY)
}

/// Offset into the newest-first active feed for the given day.
pub fn featured_offset(seed: i64, active_count: i64) -> Option<i64> {
    (active_count > 0).then(|| seed.rem_euclid(active_count))
}

pub struct FeaturedService;

impl FeaturedService {
    /// The post featured for the UTC day containing `now`.
    ///
    /// Stable for the whole day as long as the set of active posts does
    /// not change.
    pub async fn plant_of_the_day(pool: &PgPool, now: DateTime<Utc>) -> AppResult<Option<PostRow>> {
        let total = PostService::count_active(pool).await?;
        let Some(skip) = featured_offset(day_seed(now), total) else {
            return Ok(None);
        };
        tracing::debug!(total, skip, "selecting plant of the day");
        PostService::active_at(pool, skip).await
    }
}
