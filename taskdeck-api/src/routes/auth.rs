/// Authentication endpoints
///
/// - `POST /register` - Register a new user, returns a token pair
/// - `POST /login` - Authenticate and get a token pair
/// - `POST /token/refresh` - Rotate a refresh token for a new pair
///
/// Every issued refresh token is recorded in the outstanding set keyed by
/// its `jti`. Refreshing validates the token against that set and the
/// blacklist, then rotates: the old jti is blacklisted and a new pair is
/// issued. Login failures always return the same generic 401 body.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Json};
use taskdeck_shared::{
    auth::{jwt, password},
    models::{
        token::{BlacklistedToken, OutstandingToken},
        user::{CreateUser, User},
    },
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Login name
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (strength-checked separately)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional given name
    #[validate(length(max = 150, message = "First name must be at most 150 characters"))]
    pub first_name: Option<String>,

    /// Optional family name
    #[validate(length(max = 150, message = "Last name must be at most 150 characters"))]
    pub last_name: Option<String>,
}

/// Token pair response, shared by register and login
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    /// User ID
    pub user_id: String,

    /// Access token (30 min)
    pub access: String,

    /// Refresh token (12 h)
    pub refresh: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Login name
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh: String,
}

/// Issues an access/refresh pair and records the refresh token as
/// outstanding
async fn issue_token_pair(
    pool: &PgPool,
    secret: &str,
    user_id: Uuid,
) -> Result<(String, String), ApiError> {
    let access_claims = jwt::Claims::new(user_id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user_id, jwt::TokenType::Refresh);

    let access = jwt::create_token(&access_claims, secret)?;
    let refresh = jwt::create_token(&refresh_claims, secret)?;

    OutstandingToken::record(pool, user_id, refresh_claims.jti, refresh_claims.expires_at())
        .await?;

    Ok((access, refresh))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /register
/// Content-Type: application/json
///
/// {
///   "username": "jdoe",
///   "email": "user@example.com",
///   "password": "correct horse battery",
///   "first_name": "John"
/// }
/// ```
///
/// # Response
///
/// 201 with `{ "user_id": "...", "access": "eyJ...", "refresh": "eyJ..." }`
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation failed
/// - `409 Conflict`: username or email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenPairResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
        },
    )
    .await?;

    let (access, refresh) = issue_token_pair(&state.db, state.jwt_secret(), user.id).await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(TokenPairResponse {
            user_id: user.id.to_string(),
            access,
            refresh,
        }),
    ))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// { "username": "jdoe", "password": "correct horse battery" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: invalid credentials (generic message; does not
///   reveal whether the username or the password was wrong)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    req.validate()?;

    let user = User::find_by_username(&state.db, &req.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let (access, refresh) = issue_token_pair(&state.db, state.jwt_secret(), user.id).await?;

    Ok(Json(TokenPairResponse {
        user_id: user.id.to_string(),
        access,
        refresh,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access/refresh pair. Rotation is
/// enforced: the presented token's jti must be outstanding and not
/// blacklisted; it is blacklisted as part of the exchange so it can never
/// be used again.
///
/// # Endpoint
///
/// ```text
/// POST /token/refresh
/// Content-Type: application/json
///
/// { "refresh": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired, unknown, or revoked refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPairResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret())?;

    if BlacklistedToken::is_blacklisted(&state.db, claims.jti).await? {
        return Err(ApiError::Unauthorized(
            "Token is invalid or expired".to_string(),
        ));
    }

    let outstanding = OutstandingToken::find_by_jti(&state.db, claims.jti)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Token is invalid or expired".to_string()))?;

    // Rotation: revoke the presented token before issuing the new pair
    outstanding.retire(&state.db).await?;

    let (access, refresh) = issue_token_pair(&state.db, state.jwt_secret(), claims.sub).await?;

    Ok(Json(TokenPairResponse {
        user_id: claims.sub.to_string(),
        access,
        refresh,
    }))
}
