use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::location::{GeoPoint, Location, LocationInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedPreference {
    #[default]
    Global,
    Nearby,
    City,
}

impl FeedPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedPreference::Global => "global",
            FeedPreference::Nearby => "nearby",
            FeedPreference::City => "city",
        }
    }
}

impl FromStr for FeedPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(FeedPreference::Global),
            "nearby" => Ok(FeedPreference::Nearby),
            "city" => Ok(FeedPreference::City),
            other => Err(format!("unknown feed preference: {other}")),
        }
    }
}

/// Row in `users`. Never serialized directly; see [`PublicUser`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: Option<String>,
    pub bio: String,
    pub city: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_posts: i32,
    pub total_swaps: i32,
    pub feed_preference: String,
    pub notifications_enabled: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn location(&self) -> Location {
        Location {
            city: self.city.clone(),
            country: self.country.clone(),
            country_code: self.country_code.clone(),
            display_name: None,
            coordinates: GeoPoint::new(self.latitude, self.longitude),
        }
    }

    pub fn feed_preference(&self) -> FeedPreference {
        self.feed_preference.parse().unwrap_or_default()
    }

    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
            location: self.location(),
            total_posts: self.total_posts,
            total_swaps: self.total_swaps,
            feed_preference: self.feed_preference(),
            created_at: self.created_at,
        }
    }

    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            bio: self.bio.clone(),
            location: self.location(),
            total_posts: self.total_posts,
            total_swaps: self.total_swaps,
            created_at: self.created_at,
        }
    }
}

/// The caller's own account, returned by auth routes
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: String,
    pub location: Location,
    pub total_posts: i32,
    pub total_swaps: i32,
    pub feed_preference: FeedPreference,
    pub created_at: DateTime<Utc>,
}

/// Someone else's profile; no email.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub bio: String,
    pub location: Location,
    pub total_posts: i32,
    pub total_swaps: i32,
    pub created_at: DateTime<Utc>,
}

/// Author summary embedded in posts, notifications and leaderboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<SummaryLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLocation {
    pub city: String,
    pub country: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
    pub location: SummaryLocation,
    pub total_posts: i32,
    pub total_swaps: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters."))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email."))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters."))]
    pub password: Option<String>,
    pub location: Option<LocationInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters."))]
    pub name: Option<String>,
    #[validate(length(max = 200, message = "Bio cannot exceed 200 characters."))]
    pub bio: Option<String>,
    pub feed_preference: Option<FeedPreference>,
    pub avatar: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password_hash: "$argon2id$v=19$secret".into(),
            avatar: None,
            bio: String::new(),
            city: "Pune".into(),
            country: "India".into(),
            country_code: "IN".into(),
            latitude: 18.52,
            longitude: 73.85,
            total_posts: 3,
            total_swaps: 1,
            feed_preference: "nearby".into(),
            notifications_enabled: true,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_user_hides_password() {
        let json = serde_json::to_value(row().to_public()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["feedPreference"], "nearby");
        assert_eq!(json["totalPosts"], 3);
        assert_eq!(json["location"]["countryCode"], "IN");
        assert_eq!(json["location"]["coordinates"]["coordinates"][0], 73.85);
    }

    #[test]
    fn test_profile_has_no_email() {
        let json = serde_json::to_value(row().to_profile()).unwrap();
        assert!(json.get("email").is_none());
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn test_unknown_feed_preference_defaults_to_global() {
        let mut user = row();
        user.feed_preference = "sideways".into();
        assert_eq!(user.feed_preference(), FeedPreference::Global);
    }

    #[test]
    fn test_register_validation() {
        let req = RegisterRequest {
            name: Some("A".into()),
            email: Some("asha@example.com".into()),
            password: Some("secret1".into()),
            location: None,
        };
        assert!(req.validate().is_err());

        let req = RegisterRequest {
            name: Some("Asha".into()),
            email: Some("not-an-email".into()),
            password: Some("secret1".into()),
            location: None,
        };
        assert!(req.validate().is_err());

        let req = RegisterRequest {
            name: Some("Asha".into()),
            email: Some("asha@example.com".into()),
            password: Some("secret1".into()),
            location: None,
        };
        assert!(req.validate().is_ok());
    }
}
