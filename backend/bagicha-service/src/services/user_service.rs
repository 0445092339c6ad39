use crate::error::AppResult;
use crate::models::user::{FeedPreference, LeaderboardEntry, SummaryLocation, UserRow};
use crate::models::{LocationInput, UserSummary};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

pub const USER_COLUMNS: &str = "id, name, email, password_hash, avatar, bio, city, country, \
     country_code, latitude, longitude, total_posts, total_swaps, feed_preference, \
     notifications_enabled, is_verified, created_at, updated_at";

/// Leaderboard size.
pub const LEADERBOARD_LIMIT: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationUpdate {
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationUpdate {
    /// Missing names become empty; missing or out-of-range coordinates
    /// become `(0, 0)`.
    pub fn from_input(input: &LocationInput) -> Self {
        let (latitude, longitude) = input.coordinates().unwrap_or((0.0, 0.0));
        let text = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or_default().to_string();
        Self {
            city: text(&input.city),
            country: text(&input.country),
            country_code: text(&input.country_code).to_uppercase(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub location: LocationUpdate,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub feed_preference: Option<FeedPreference>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.bio.is_none()
            && self.feed_preference.is_none()
            && self.avatar.is_none()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct LeaderboardRow {
    id: Uuid,
    name: String,
    avatar: Option<String>,
    city: String,
    country: String,
    country_code: String,
    total_posts: i32,
    total_swaps: i32,
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

pub struct UserService;

impl UserService {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Lookup by email; the address is compared lowercase.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn create(pool: &PgPool, new_user: NewUser) -> AppResult<UserRow> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, city, country, country_code,
                               latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(new_user.name.trim())
        .bind(new_user.email.trim().to_lowercase())
        .bind(&new_user.password_hash)
        .bind(&new_user.location.city)
        .bind(&new_user.location.country)
        .bind(&new_user.location.country_code)
        .bind(new_user.location.latitude)
        .bind(new_user.location.longitude)
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn update_location(
        pool: &PgPool,
        id: Uuid,
        location: &LocationUpdate,
    ) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET city = $2, country = $3, country_code = $4,
                latitude = $5, longitude = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&location.city)
        .bind(&location.country)
        .bind(&location.country_code)
        .bind(location.latitude)
        .bind(location.longitude)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                feed_preference = COALESCE($4, feed_preference),
                avatar = COALESCE($5, avatar),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.bio.as_deref())
        .bind(update.feed_preference.map(|p| p.as_str()))
        .bind(update.avatar.as_deref())
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Adjust `total_posts`, never below zero.
    pub async fn adjust_post_count(pool: &PgPool, id: Uuid, delta: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET total_posts = GREATEST(total_posts + $2, 0), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn increment_swaps(pool: &PgPool, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET total_swaps = total_swaps + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn summary(pool: &PgPool, id: Uuid) -> AppResult<Option<UserSummary>> {
        Ok(Self::find_by_id(pool, id).await?.map(|user| UserSummary {
            id: user.id,
            name: user.name,
            avatar: user.avatar,
            location: None,
        }))
    }

    /// Ids of users whose city matches `city` case-insensitively.
    pub async fn ids_in_city(
        pool: &PgPool,
        city: &str,
        exclude: Uuid,
        limit: i64,
    ) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM users
            WHERE lower(city) = lower($1) AND id <> $2 AND notifications_enabled
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(city.trim())
        .bind(exclude)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    /// Top swappers, optionally within a city (substring, case-insensitive).
    pub async fn leaderboard(pool: &PgPool, city: Option<&str>) -> AppResult<Vec<LeaderboardEntry>> {
        let mut builder = QueryBuilder::new(
            "SELECT id, name, avatar, city, country, country_code, total_posts, total_swaps FROM users",
        );
        if let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) {
            builder.push(" WHERE city ILIKE ").push_bind(like_pattern(city));
        }
        builder
            .push(" ORDER BY total_swaps DESC, total_posts DESC LIMIT ")
            .push_bind(LEADERBOARD_LIMIT);

        let rows = builder
            .build_query_as::<LeaderboardRow>()
            .fetch_all(pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| LeaderboardEntry {
                id: row.id,
                name: row.name,
                avatar: row.avatar,
                location: SummaryLocation {
                    city: row.city,
                    country: row.country,
                    country_code: row.country_code,
                },
                total_posts: row.total_posts,
                total_swaps: row.total_swaps,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rose"), "%rose%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_location_update_from_input() {
        let update = LocationUpdate::from_input(&LocationInput {
            city: Some(" Pune ".into()),
            country: Some("India".into()),
            country_code: Some("in".into()),
            lat: Some(18.52),
            lon: Some(73.85),
        });
        assert_eq!(update.city, "Pune");
        assert_eq!(update.country_code, "IN");
        assert_eq!((update.latitude, update.longitude), (18.52, 73.85));

        let blank = LocationUpdate::from_input(&LocationInput {
            lat: Some(120.0),
            lon: Some(10.0),
            ..Default::default()
        });
        assert_eq!(blank, LocationUpdate::default());
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            bio: Some(String::new()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
