/// Authentication middleware for axum
///
/// Validates Bearer access tokens from the Authorization header and injects
/// an [`AuthUser`] into request extensions for handlers to extract.
///
/// # Example
///
/// ```no_run
/// use axum::{Extension, Router, routing::get};
/// use taskdeck_shared::auth::middleware::AuthUser;
///
/// async fn protected_handler(Extension(auth): Extension<AuthUser>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
/// ```

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// Authenticated-user context added to request extensions
///
/// Present on every request that passed the Bearer-token middleware.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthUser {
    /// Authenticated user ID
    pub user_id: Uuid,
}

/// Error type for the authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
        }
    }
}

/// Bearer-token authentication middleware
///
/// Validates the access token from `Authorization: Bearer <token>` and adds
/// [`AuthUser`] to request extensions.
///
/// # Errors
///
/// Returns 401 if the header is missing or the token is invalid or expired;
/// 400 if the header is not a Bearer token.
pub async fn bearer_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, &secret).map_err(|e| match e {
        // Generic message: never reveal which part of the credential failed
        JwtError::Expired => AuthError::InvalidToken("Token is invalid or expired".to_string()),
        _ => AuthError::InvalidToken("Token is invalid or expired".to_string()),
    })?;

    req.extensions_mut().insert(AuthUser { user_id: claims.sub });

    Ok(next.run(req).await)
}

/// Creates a Bearer-token middleware closure
///
/// Helper that captures the JWT secret and returns a function usable with
/// `axum::middleware::from_fn`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use taskdeck_shared::auth::middleware::bearer_auth;
///
/// let app: Router = Router::new()
///     .route("/protected", get(|| async { "OK" }))
///     .layer(middleware::from_fn(bearer_auth("secret")));
/// ```
pub fn bearer_auth(
    secret: impl Into<String>,
) -> impl Fn(
    Request,
    Next,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>,
> + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(bearer_auth_middleware(secret, req, next))
    }
}
