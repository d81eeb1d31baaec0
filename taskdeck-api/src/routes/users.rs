/// User profile endpoints
///
/// - `GET /users/me` - Cached profile read
/// - `PATCH /users/me` - Partial profile update
///
/// The read path is cache-aside: the serialized profile payload is cached
/// under `user_details_{user_id}` with a fixed TTL and returned verbatim on
/// a hit. Any profile write deletes that key before responding. Cache
/// failures on the read path are logged and degrade to the database.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, Extension, Json};
use taskdeck_shared::{
    auth::{middleware::AuthUser, password},
    cache::store,
    models::user::{UpdateUser, User},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

/// Profile response payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    /// User ID
    pub id: String,

    /// Login name
    pub username: String,

    /// Email address
    pub email: String,

    /// Given name
    pub first_name: Option<String>,

    /// Family name
    pub last_name: Option<String>,

    /// Account creation timestamp
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        ProfileResponse {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            date_joined: user.date_joined,
        }
    }
}

/// Profile update request
///
/// All fields optional; only provided fields are changed.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    /// New email address
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New password (strength-checked)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,

    /// New given name
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    /// New family name
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,
}

/// Cached profile read
///
/// # Endpoint
///
/// ```text
/// GET /users/me
/// Authorization: Bearer <access token>
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: missing or invalid token
/// - `404 Not Found`: account no longer exists
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<JsonValue>> {
    let cache_key = store::user_details_key(auth.user_id);

    // Cache hit: return the stored payload verbatim
    match store::get_json(&state.cache, &cache_key).await {
        Ok(Some(cached)) => return Ok(Json(cached)),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, key = %cache_key, "Cache read failed, falling back to database");
        }
    }

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    let payload = serde_json::to_value(ProfileResponse::from(&user))
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;

    if let Err(e) = store::set_json(&state.cache, &cache_key, &payload).await {
        tracing::warn!(error = %e, key = %cache_key, "Cache populate failed");
    }

    Ok(Json(payload))
}

/// Partial profile update
///
/// Invalidates the cached profile payload before responding.
///
/// # Endpoint
///
/// ```text
/// PATCH /users/me
/// Authorization: Bearer <access token>
/// Content-Type: application/json
///
/// { "email": "new@example.com" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `409 Conflict`: email already in use
/// - `404 Not Found`: account no longer exists
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<JsonValue>> {
    req.validate()?;

    let password_hash = match &req.password {
        Some(pw) => {
            password::validate_password_strength(pw).map_err(|e| {
                ApiError::ValidationError(vec![ValidationErrorDetail {
                    field: "password".to_string(),
                    message: e,
                }])
            })?;
            Some(password::hash_password(pw)?)
        }
        None => None,
    };

    let update = UpdateUser {
        email: req.email,
        password_hash,
        first_name: req.first_name.map(Some),
        last_name: req.last_name.map(Some),
    };

    let user = User::update(&state.db, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    // Invalidate before responding so the next read repopulates
    store::delete(&state.cache, &store::user_details_key(auth.user_id)).await?;

    let payload = serde_json::to_value(ProfileResponse::from(&user))
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;

    Ok(Json(payload))
}
