//! Post persistence and the feed query.
//!
//! Every read joins the author (`POST_SELECT` + `POST_FROM`). Feed filters
//! are assembled with `QueryBuilder` so the same predicate feeds both the
//! page query and the count query.

use crate::error::{AppError, AppResult};
use crate::models::location::{valid_coordinates, EARTH_RADIUS_M};
use crate::models::post::{
    PlantAnalysis, PostRow, PostType, PostView, UpdatePostRequest, WeatherSnapshot, POST_FROM,
    POST_SELECT,
};
use crate::models::{offset, PageQuery, Pagination};
use crate::services::user_service::like_pattern;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

pub const DEFAULT_FEED_LIMIT: i64 = 20;
pub const MAX_FEED_LIMIT: i64 = 100;
pub const DEFAULT_RADIUS_M: f64 = 50_000.0;

/// Raw `GET /api/posts` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub feed: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius: Option<f64>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub tags: Option<String>,
    pub health_status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Near {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
}

/// Validated feed filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFilter {
    pub near: Option<Near>,
    pub city: Option<String>,
    pub post_type: Option<PostType>,
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub health_status: Option<String>,
    pub page: i64,
    pub limit: i64,
}

impl Default for FeedFilter {
    fn default() -> Self {
        Self {
            near: None,
            city: None,
            post_type: None,
            search: None,
            tags: Vec::new(),
            health_status: None,
            page: 1,
            limit: DEFAULT_FEED_LIMIT,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FeedFilter {
    pub fn from_query(query: &FeedQuery) -> Self {
        let feed = query.feed.as_deref().unwrap_or("global");
        let (page, limit) = PageQuery {
            page: query.page,
            limit: query.limit,
        }
        .resolve(DEFAULT_FEED_LIMIT, MAX_FEED_LIMIT);

        let near = match (feed, query.lat, query.lon) {
            ("nearby", Some(lat), Some(lon)) if valid_coordinates(lat, lon) => Some(Near {
                lat,
                lon,
                radius_m: query
                    .radius
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .unwrap_or(DEFAULT_RADIUS_M),
            }),
            _ => None,
        };
        let city = if feed == "city" { non_blank(&query.city) } else { None };

        let tags = query
            .tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            near,
            city,
            post_type: query.post_type.as_deref().and_then(|t| t.parse().ok()),
            search: non_blank(&query.search),
            tags,
            health_status: non_blank(&query.health_status),
            page,
            limit,
        }
    }

    /// Active posts only, newest first; the fallback when filtering fails.
    pub fn unfiltered(&self) -> Self {
        Self {
            page: self.page,
            limit: self.limit,
            ..Self::default()
        }
    }
}

fn push_distance(builder: &mut QueryBuilder<'_, Postgres>, near: &Near) {
    builder
        .push("(2 * ")
        .push(EARTH_RADIUS_M)
        .push(" * ASIN(LEAST(1.0, SQRT(POWER(SIN(RADIANS(p.latitude - ")
        .push_bind(near.lat)
        .push(") / 2), 2) + COS(RADIANS(")
        .push_bind(near.lat)
        .push(")) * COS(RADIANS(p.latitude)) * POWER(SIN(RADIANS(p.longitude - ")
        .push_bind(near.lon)
        .push(") / 2), 2)))))");
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &FeedFilter) {
    builder.push(" WHERE p.is_active");

    if let Some(near) = &filter.near {
        builder.push(" AND ");
        push_distance(builder, near);
        builder.push(" <= ").push_bind(near.radius_m);
    } else if let Some(city) = &filter.city {
        builder.push(" AND p.city ILIKE ").push_bind(like_pattern(city));
    }

    if let Some(post_type) = filter.post_type {
        builder.push(" AND p.post_type = ").push_bind(post_type.as_str());
    }
    if let Some(status) = &filter.health_status {
        builder
            .push(" AND p.ai_analysis->>'healthStatus' = ")
            .push_bind(status.clone());
    }
    if !filter.tags.is_empty() {
        builder.push(" AND p.tags && ").push_bind(filter.tags.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        builder
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.ai_analysis->>'commonName' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.ai_analysis->>'species' ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(p.tags) AS tag WHERE tag ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

pub fn build_feed_query(filter: &FeedFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(POST_SELECT);
    if let Some(near) = &filter.near {
        builder.push(", ");
        push_distance(&mut builder, near);
        builder.push(" AS distance_m");
    }
    builder.push(POST_FROM);
    push_filters(&mut builder, filter);

    if filter.near.is_some() {
        builder.push(" ORDER BY distance_m ASC, p.created_at DESC");
    } else {
        builder.push(" ORDER BY p.created_at DESC");
    }
    builder
        .push(" LIMIT ")
        .push_bind(filter.limit)
        .push(" OFFSET ")
        .push_bind(offset(filter.page, filter.limit));
    builder
}

pub fn build_feed_count(filter: &FeedFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM posts p");
    push_filters(&mut builder, filter);
    builder
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub pagination: Pagination,
}

/// Fields of a post about to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub post_type: PostType,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub ai_analysis: PlantAnalysis,
    pub weather_snapshot: WeatherSnapshot,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub display_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub tags: Vec<String>,
}

/// Validated edit to an existing post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub post_type: Option<PostType>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl PostUpdate {
    pub fn from_request(req: UpdatePostRequest) -> AppResult<Self> {
        let post_type = match req.post_type.as_deref() {
            Some(raw) => Some(raw.parse::<PostType>().map_err(|_| {
                AppError::Validation("Post type must be 'available' or 'wanted'.".into())
            })?),
            None => None,
        };
        let title = req.title.map(|t| t.trim().to_string());
        if title.as_ref().is_some_and(|t| t.is_empty() || t.chars().count() > 100) {
            return Err(AppError::Validation("Title must be 1-100 characters.".into()));
        }
        let description = req.description.map(|d| d.trim().to_string());
        if description.as_ref().is_some_and(|d| d.chars().count() > 500) {
            return Err(AppError::Validation(
                "Description cannot exceed 500 characters.".into(),
            ));
        }
        Ok(Self {
            title,
            description,
            post_type,
            is_active: req.is_active,
            tags: req.tags.map(crate::models::post::normalize_tags),
        })
    }
}

/// Result of toggling interest on a post.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InterestToggle {
    pub is_interested: bool,
    pub interested_count: i32,
    pub owner_id: Uuid,
    pub title: String,
    pub common_name: Option<String>,
}

impl InterestToggle {
    pub fn plant_name(&self) -> String {
        [self.common_name.as_deref(), Some(self.title.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("your plant")
            .to_string()
    }
}

pub struct PostService;

impl PostService {
    async fn run_feed(pool: &PgPool, filter: &FeedFilter) -> AppResult<FeedPage> {
        let rows = build_feed_query(filter)
            .build_query_as::<PostRow>()
            .fetch_all(pool)
            .await?;
        let total: i64 = build_feed_count(filter)
            .build_query_scalar()
            .fetch_one(pool)
            .await?;

        let pagination = Pagination::new(total, filter.page, filter.limit, rows.len());
        Ok(FeedPage {
            posts: rows.into_iter().map(PostRow::into_view).collect(),
            pagination,
        })
    }

    /// Filtered feed. A failing filtered query falls back to the plain
    /// active feed.
    pub async fn feed(pool: &PgPool, filter: &FeedFilter) -> AppResult<FeedPage> {
        match Self::run_feed(pool, filter).await {
            Ok(page) => Ok(page),
            Err(e) => {
                tracing::warn!(error = %e, "feed query failed, serving unfiltered feed");
                Self::run_feed(pool, &filter.unfiltered()).await
            }
        }
    }

    pub async fn create(pool: &PgPool, post: NewPost) -> AppResult<PostRow> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO posts (id, user_id, post_type, title, description, image_url,
                               ai_analysis, weather_snapshot, city, country, country_code,
                               display_name, latitude, longitude, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post.user_id)
        .bind(post.post_type.as_str())
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.image_url.as_deref())
        .bind(Json(&post.ai_analysis))
        .bind(Json(&post.weather_snapshot))
        .bind(&post.city)
        .bind(&post.country)
        .bind(&post.country_code)
        .bind(&post.display_name)
        .bind(post.latitude)
        .bind(post.longitude)
        .bind(&post.tags)
        .fetch_one(pool)
        .await?;

        tracing::info!(post_id = %id, user_id = %post.user_id, "post created");
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::Database(format!("post {id} vanished after insert")))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<PostRow>> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT}{POST_FROM} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    pub async fn find_active(pool: &PgPool, id: Uuid) -> AppResult<Option<PostRow>> {
        Ok(Self::find_by_id(pool, id).await?.filter(|p| p.is_active))
    }

    /// Active posts by `user_id`, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: Uuid,
        post_type: Option<PostType>,
        page: i64,
        limit: i64,
    ) -> AppResult<(Vec<PostRow>, i64)> {
        let type_filter = post_type.map(|t| t.as_str());
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT}{POST_FROM} WHERE p.user_id = $1 AND p.is_active \
             AND ($2::text IS NULL OR p.post_type = $2) \
             ORDER BY p.created_at DESC LIMIT $3 OFFSET $4"
        ))
        .bind(user_id)
        .bind(type_filter)
        .bind(limit)
        .bind(offset(page, limit))
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE user_id = $1 AND is_active \
             AND ($2::text IS NULL OR post_type = $2)",
        )
        .bind(user_id)
        .bind(type_filter)
        .fetch_one(pool)
        .await?;

        Ok((rows, total))
    }

    pub async fn update(pool: &PgPool, id: Uuid, update: &PostUpdate) -> AppResult<Option<PostRow>> {
        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                post_type = COALESCE($4, post_type),
                is_active = COALESCE($5, is_active),
                tags = COALESCE($6, tags),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.post_type.map(|t| t.as_str()))
        .bind(update.is_active)
        .bind(update.tags.as_ref())
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip `user_id`'s interest in one statement. The count never goes
    /// below zero.
    pub async fn toggle_interest(
        pool: &PgPool,
        post_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<InterestToggle>> {
        let toggled = sqlx::query_as::<_, InterestToggle>(
            r#"
            UPDATE posts
            SET interested_users = CASE WHEN $2 = ANY(interested_users)
                                        THEN array_remove(interested_users, $2)
                                        ELSE array_append(interested_users, $2) END,
                interested_count = CASE WHEN $2 = ANY(interested_users)
                                        THEN GREATEST(interested_count - 1, 0)
                                        ELSE interested_count + 1 END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING $2 = ANY(interested_users) AS is_interested,
                      interested_count,
                      user_id AS owner_id,
                      title,
                      ai_analysis->>'commonName' AS common_name
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(toggled)
    }

    pub async fn mark_swapped(
        pool: &PgPool,
        id: Uuid,
        swapped_with: Option<Uuid>,
    ) -> AppResult<Option<PostRow>> {
        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET is_swapped = TRUE, is_active = FALSE, swapped_at = NOW(),
                swapped_with = COALESCE($2, swapped_with), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(swapped_with)
        .execute(pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        Self::find_by_id(pool, id).await
    }

    pub async fn count_active(pool: &PgPool) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE is_active")
            .fetch_one(pool)
            .await?;
        Ok(total)
    }

    /// The `skip`-th active post, newest first.
    pub async fn active_at(pool: &PgPool, skip: i64) -> AppResult<Option<PostRow>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT}{POST_FROM} WHERE p.is_active ORDER BY p.created_at DESC LIMIT 1 OFFSET $1"
        ))
        .bind(skip)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// Newest active posts not owned by `exclude_user`.
    pub async fn match_candidates(
        pool: &PgPool,
        exclude_user: Uuid,
        limit: i64,
    ) -> AppResult<Vec<PostRow>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT}{POST_FROM} WHERE p.is_active AND p.user_id <> $1 \
             ORDER BY p.created_at DESC LIMIT $2"
        ))
        .bind(exclude_user)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> AppResult<Vec<PostRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT}{POST_FROM} WHERE p.id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn active_by_type(
        pool: &PgPool,
        user_id: Uuid,
        post_type: PostType,
    ) -> AppResult<Vec<PostRow>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "{POST_SELECT}{POST_FROM} WHERE p.user_id = $1 AND p.is_active AND p.post_type = $2 \
             ORDER BY p.created_at DESC"
        ))
        .bind(user_id)
        .bind(post_type.as_str())
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
