use crate::error::AppError;
use crate::routes::ok_data;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl CoordinatesQuery {
    fn require(&self) -> Result<(f64, f64), AppError> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Ok((lat, lon)),
            _ => Err(AppError::BadRequest("lat and lon are required.".into())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[get("/current")]
pub async fn current(
    state: web::Data<AppState>,
    query: web::Query<CoordinatesQuery>,
) -> Result<HttpResponse, AppError> {
    let (lat, lon) = query.require()?;
    Ok(ok_data(state.weather.current(lat, lon).await))
}

#[get("/geocode")]
pub async fn geocode(
    state: web::Data<AppState>,
    query: web::Query<CoordinatesQuery>,
) -> Result<HttpResponse, AppError> {
    let (lat, lon) = query.require()?;
    Ok(ok_data(state.weather.reverse_geocode(lat, lon).await))
}

#[get("/search")]
pub async fn search(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.chars().count() < 2 {
        return Err(AppError::BadRequest(
            "Search query must be at least 2 characters.".into(),
        ));
    }
    Ok(ok_data(state.weather.search_city(q).await))
}

/// Weather and place name in one call.
#[get("/full")]
pub async fn full(
    state: web::Data<AppState>,
    query: web::Query<CoordinatesQuery>,
) -> Result<HttpResponse, AppError> {
    let (lat, lon) = query.require()?;
    let (weather, location) = futures::join!(
        state.weather.current(lat, lon),
        state.weather.reverse_geocode(lat, lon)
    );
    Ok(ok_data(json!({ "weather": weather, "location": location })))
}
