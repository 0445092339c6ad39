use crate::error::{AppError, Context};
use crate::middleware::User;
use crate::models::{PostRow, PostType, PostView};
use crate::routes::{non_blank, ok_data};
use crate::services::ai::{AnalysisRequest, CareScheduleRequest, MatchCandidate, MatchRequest};
use crate::services::{PostService, UserService};
use crate::state::AppState;
use actix_web::{get, post, web, HttpResponse};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Posts offered to the matchmaker per request.
const MATCH_CANDIDATE_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_url: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBase64Request {
    pub image_base64: Option<String>,
    pub mime_type: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBody {
    pub post_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CareScheduleQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HydratedMatch {
    post: PostView,
    reason: String,
    match_score: f64,
}

/// "city, country", else city, else "your location".
fn location_label(city: Option<&str>, country: Option<&str>) -> String {
    match (non_blank(city), non_blank(country)) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (Some(city), None) => city.to_string(),
        _ => "your location".to_string(),
    }
}

/// Strip an optional `data:<mime>;base64,` prefix and check the payload decodes.
fn decode_image(raw: &str) -> Result<String, AppError> {
    let payload = raw
        .split_once(";base64,")
        .map(|(_, data)| data)
        .unwrap_or(raw)
        .trim();
    STANDARD
        .decode(payload)
        .map_err(|_| AppError::BadRequest("imageBase64 is not valid base64.".into()))?;
    Ok(payload.to_string())
}

#[post("/analyze")]
pub async fn analyze(
    state: web::Data<AppState>,
    _user: User,
    body: web::Json<AnalyzeRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let image_url = non_blank(req.image_url.as_deref())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest("Please provide an image file or imageUrl.".into()))?;

    let weather = state.weather.maybe_current(req.lat, req.lon).await;
    let outcome = state
        .ai
        .analyze_plant(&AnalysisRequest {
            image_url: Some(image_url.clone()),
            image_base64: None,
            mime_type: None,
            weather: weather.clone(),
            location: location_label(req.city.as_deref(), req.country.as_deref()),
        })
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "success": outcome.success,
        "data": outcome.data,
        "imageUrl": image_url,
        "weather": weather,
        "analyzedAt": Utc::now(),
    })))
}

#[post("/analyze-base64")]
pub async fn analyze_base64(
    state: web::Data<AppState>,
    _user: User,
    body: web::Json<AnalyzeBase64Request>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let (Some(image), Some(mime_type)) = (
        non_blank(req.image_base64.as_deref()),
        non_blank(req.mime_type.as_deref()),
    ) else {
        return Err(AppError::BadRequest(
            "imageBase64 and mimeType are required.".into(),
        ));
    };
    let image = decode_image(image)?;

    let weather = state.weather.maybe_current(req.lat, req.lon).await;
    let outcome = state
        .ai
        .analyze_plant(&AnalysisRequest {
            image_url: None,
            image_base64: Some(image),
            mime_type: Some(mime_type.to_string()),
            weather: weather.clone(),
            location: location_label(req.city.as_deref(), req.country.as_deref()),
        })
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "success": outcome.success,
        "data": outcome.data,
        "weather": weather,
        "analyzedAt": Utc::now(),
    })))
}

#[post("/match")]
pub async fn find_matches(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<MatchBody>,
) -> Result<HttpResponse, AppError> {
    let post_id = body
        .post_id
        .ok_or_else(|| AppError::BadRequest("postId is required.".into()))?;

    let (user_post, candidates) = async {
        let user_post = PostService::find_by_id(&state.db, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found.".into()))?;
        let candidates =
            PostService::match_candidates(&state.db, user.id, MATCH_CANDIDATE_LIMIT).await?;
        Ok::<_, AppError>((user_post, candidates))
    }
    .await
    .context("Matching failed.")?;

    let request = MatchRequest {
        user_post: MatchCandidate::from(&user_post),
        candidates: candidates.iter().map(MatchCandidate::from).collect(),
        user_location: Some(user_post.display_name.clone()).filter(|l| !l.is_empty()),
    };
    let result = state.ai.find_matches(&request).await;

    let ids: Vec<Uuid> = result
        .matches
        .iter()
        .filter_map(|m| m.post_id.parse().ok())
        .collect();
    let mut found: HashMap<Uuid, PostRow> = PostService::find_many(&state.db, &ids)
        .await
        .context("Matching failed.")?
        .into_iter()
        .map(|row| (row.id, row))
        .collect();

    let matches: Vec<HydratedMatch> = result
        .matches
        .into_iter()
        .filter_map(|m| {
            let id: Uuid = m.post_id.parse().ok()?;
            let post = found.remove(&id)?;
            Some(HydratedMatch {
                post: post.into_view(),
                reason: m.reason,
                match_score: m.match_score,
            })
        })
        .collect();

    Ok(ok_data(json!({
        "matches": matches,
        "matchTip": result.match_tip,
        "totalCandidates": candidates.len(),
    })))
}

#[get("/care-schedule")]
pub async fn care_schedule(
    state: web::Data<AppState>,
    user: User,
    query: web::Query<CareScheduleQuery>,
) -> Result<HttpResponse, AppError> {
    let (plants, owner) = async {
        let plants = PostService::active_by_type(&state.db, user.id, PostType::Available).await?;
        let owner = UserService::find_by_id(&state.db, user.id).await?;
        Ok::<_, AppError>((plants, owner))
    }
    .await
    .context("Failed to generate care schedule.")?;

    if plants.is_empty() {
        return Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "No plants found. Share some plants first!",
            "data": null,
        })));
    }

    let weather = state.weather.maybe_current(query.lat, query.lon).await;
    let request = CareScheduleRequest {
        plants: plants
            .iter()
            .map(|p| p.ai_analysis.plant_name(&p.title).to_string())
            .collect(),
        weather,
        city: owner
            .map(|u| u.city)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
    };

    let schedule = state.ai.care_schedule(&request).await?;
    Ok(ok_data(schedule))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_label() {
        assert_eq!(location_label(Some("Pune"), Some("India")), "Pune, India");
        assert_eq!(location_label(Some("Pune"), None), "Pune");
        assert_eq!(location_label(None, Some("India")), "your location");
        assert_eq!(location_label(Some(" "), Some(" ")), "your location");
    }

    #[test]
    fn test_decode_image_accepts_data_url() {
        let encoded = STANDARD.encode(b"\x89PNG");
        assert_eq!(decode_image(&encoded).unwrap(), encoded);
        assert_eq!(
            decode_image(&format!("data:image/png;base64,{encoded}")).unwrap(),
            encoded
        );
        assert!(matches!(
            decode_image("not base64!!"),
            Err(AppError::BadRequest(_))
        ));
    }
}
