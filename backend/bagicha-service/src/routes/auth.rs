use crate::error::{AppError, AppResult, Context};
use crate::middleware::User;
use crate::models::location::LocationInput;
use crate::models::user::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::routes::non_blank;
use crate::services::user_service::{LocationUpdate, NewUser, ProfileUpdate};
use crate::services::UserService;
use crate::state::AppState;
use actix_web::{get, patch, post, web, HttpResponse};
use serde_json::json;
use validator::Validate;

const EMAIL_TAKEN: &str = "An account with this email already exists.";
const INVALID_CREDENTIALS: &str = "Invalid email or password.";

async fn hash_password(password: String) -> AppResult<String> {
    web::block(move || crypto_core::hash_password(&password))
        .await
        .map_err(|e| AppError::Unexpected(format!("hashing task failed: {e}")))?
        .map_err(AppError::from)
}

async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    web::block(move || crypto_core::verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Unexpected(format!("verify task failed: {e}")))?
        .map_err(AppError::from)
}

#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let (Some(name), Some(email), Some(password)) = (
        non_blank(req.name.as_deref()),
        non_blank(req.email.as_deref()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Name, email, and password are required.".into(),
        ));
    };
    req.validate()?;

    let registered = async {
        if UserService::find_by_email(&state.db, email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }

        let location = req
            .location
            .as_ref()
            .map(LocationUpdate::from_input)
            .unwrap_or_default();
        let user = UserService::create(
            &state.db,
            NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: hash_password(password.to_string()).await?,
                location,
            },
        )
        .await
        .map_err(|e| match e {
            AppError::Conflict(_) => AppError::Conflict(EMAIL_TAKEN.into()),
            other => other,
        })?;
        let token = crypto_core::jwt::generate_token(user.id)?;
        Ok::<_, AppError>((user, token))
    }
    .await
    .context("Registration failed. Please try again.")?;

    let (user, token) = registered;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Welcome to BagichaLink! 🌿",
        "token": token,
        "user": user.to_public(),
    })))
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let (Some(email), Some(password)) = (
        non_blank(req.email.as_deref()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest("Email and password are required.".into()));
    };

    let authenticated = async {
        let Some(user) = UserService::find_by_email(&state.db, email).await? else {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };
        if !verify_password(password, user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "login rejected: wrong password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        let token = crypto_core::jwt::generate_token(user.id)?;
        Ok::<_, AppError>((user, token))
    }
    .await
    .context("Login failed. Please try again.")?;

    let (user, token) = authenticated;
    tracing::info!(user_id = %user.id, "user logged in");
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Welcome back! 🌱",
        "token": token,
        "user": user.to_public(),
    })))
}

#[get("/me")]
pub async fn me(state: web::Data<AppState>, user: User) -> Result<HttpResponse, AppError> {
    let row = UserService::find_by_id(&state.db, user.id)
        .await
        .context("Failed to fetch user.")?
        .ok_or_else(|| AppError::Unauthorized("Not authorized, user not found".into()))?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": row.to_public() })))
}

#[patch("/update-location")]
pub async fn update_location(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<LocationInput>,
) -> Result<HttpResponse, AppError> {
    let location = LocationUpdate::from_input(&body);
    let row = UserService::update_location(&state.db, user.id, &location)
        .await
        .context("Failed to update location.")?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Location updated.",
        "user": row.to_public(),
    })))
}

#[patch("/update-profile")]
pub async fn update_profile(
    state: web::Data<AppState>,
    user: User,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    req.validate()?;

    let update = ProfileUpdate {
        name: non_blank(req.name.as_deref()).map(str::to_string),
        bio: req.bio.map(|b| b.trim().to_string()),
        feed_preference: req.feed_preference,
        avatar: non_blank(req.avatar.as_deref()).map(str::to_string),
    };
    let row = UserService::update_profile(&state.db, user.id, &update)
        .await
        .context("Failed to update profile.")?
        .ok_or_else(|| AppError::NotFound("User not found.".into()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated.",
        "user": row.to_public(),
    })))
}

/// Tokens are stateless; the client discards its copy.
#[post("/logout")]
pub async fn logout(_user: User) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "message": "Logged out successfully." }))
}
