use crate::models::{PlantAnalysis, PostRow};
use crate::models::post::{CareLevel, HealthStatus};
use crate::services::weather::WeatherReport;
use serde::{Deserialize, Serialize};

pub const NO_MATCHES_TIP: &str = "No matches found right now. Try again later!";

/// Image to identify, plus the context a provider may use in its answer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub weather: Option<WeatherReport>,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub success: bool,
    pub data: PlantAnalysis,
    #[serde(skip)]
    pub provider: Option<String>,
}

/// Returned when no provider could identify the plant.
pub fn fallback_analysis() -> PlantAnalysis {
    PlantAnalysis {
        species: "Unknown".into(),
        common_name: "Unknown Plant".into(),
        diagnosis: "Could not analyze the image. Please try with a clearer photo.".into(),
        health_status: HealthStatus::Unknown,
        tips: vec![
            "Ensure good lighting".into(),
            "Try a closer shot".into(),
            "Make sure plant fills the frame".into(),
        ],
        care_level: CareLevel::Moderate,
        watering_frequency: "Unknown".into(),
        sunlight: "Unknown".into(),
        best_for: "All gardeners".into(),
        fun_fact: "Plants are amazing living organisms!".into(),
        ..PlantAnalysis::default()
    }
}

/// Compact post description handed to matchmaking providers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub post_id: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub plant: String,
    pub tags: Vec<String>,
    pub location: String,
}

impl From<&PostRow> for MatchCandidate {
    fn from(post: &PostRow) -> Self {
        Self {
            post_id: post.id.to_string(),
            post_type: post.post_type.clone(),
            plant: post.ai_analysis.plant_name(&post.title).to_string(),
            tags: post.tags.clone(),
            location: post.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub user_post: MatchCandidate,
    pub candidates: Vec<MatchCandidate>,
    pub user_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSuggestion {
    pub post_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub matches: Vec<MatchSuggestion>,
    #[serde(default)]
    pub match_tip: String,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            matches: Vec::new(),
            match_tip: NO_MATCHES_TIP.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareScheduleRequest {
    pub plants: Vec<String>,
    pub weather: Option<WeatherReport>,
    pub city: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklySchedule {
    pub monday: Vec<String>,
    pub tuesday: Vec<String>,
    pub wednesday: Vec<String>,
    pub thursday: Vec<String>,
    pub friday: Vec<String>,
    pub saturday: Vec<String>,
    pub sunday: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CareSchedule {
    pub schedule: WeeklySchedule,
    pub weekly_tip: String,
    pub urgent_alerts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_analysis() {
        let analysis = fallback_analysis();
        assert_eq!(analysis.common_name, "Unknown Plant");
        assert_eq!(analysis.health_status, HealthStatus::Unknown);
        assert_eq!(analysis.emoji, "🌿");
        assert_eq!(analysis.tips.len(), 3);
        assert!(analysis.tags.is_empty());
    }

    #[test]
    fn test_match_result_tolerates_missing_fields() {
        let parsed: MatchResult =
            serde_json::from_str(r#"{"matches":[{"postId":"abc"}]}"#).unwrap();
        assert_eq!(parsed.matches[0].match_score, 0.0);
        assert_eq!(parsed.match_tip, "");
    }

    #[test]
    fn test_care_schedule_partial_week() {
        let parsed: CareSchedule = serde_json::from_str(
            r#"{"schedule":{"monday":["Water the tulsi"]},"weeklyTip":"Rotate pots"}"#,
        )
        .unwrap();
        assert_eq!(parsed.schedule.monday, vec!["Water the tulsi"]);
        assert!(parsed.schedule.sunday.is_empty());
        assert!(parsed.urgent_alerts.is_empty());
    }
}
