/// Common test utilities for integration tests
///
/// Shared infrastructure for integration tests:
/// - Test database and cache connections
/// - Test user creation
/// - JWT token generation
/// - Request helpers
///
/// These tests require live PostgreSQL and Redis instances; see the
/// `#[ignore]` attributes on the tests that use them.

use axum::body::Body;
use axum::http::Request;
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::Config;
use taskdeck_shared::auth::jwt::{create_token, Claims, TokenType};
use taskdeck_shared::auth::password::hash_password;
use taskdeck_shared::cache::{CacheClient, CacheConfig};
use taskdeck_shared::models::user::{CreateUser, User};
use sqlx::PgPool;
use uuid::Uuid;

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub cache: CacheClient,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub access_token: String,
}

impl TestContext {
    /// Creates a new test context with a fresh user
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Path relative to this crate's Cargo.toml
        sqlx::migrate!("../migrations").run(&db).await?;

        let cache = CacheClient::new(CacheConfig::from_env()?).await?;

        let user = create_test_user(&db).await?;

        let claims = Claims::new(user.id, TokenType::Access);
        let access_token = create_token(&claims, &config.jwt.secret)?;

        let state = AppState::new(db.clone(), cache.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            cache,
            app,
            config,
            user,
            access_token,
        })
    }

    /// Authorization header value for the context's user
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Removes the test user (tasks and tokens cascade)
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        User::delete(&self.db, self.user.id).await?;
        Ok(())
    }
}

/// Creates a user with a unique username
pub async fn create_test_user(db: &PgPool) -> anyhow::Result<User> {
    let suffix = Uuid::new_v4().simple().to_string();
    let user = User::create(
        db,
        CreateUser {
            username: format!("testuser_{}", &suffix[..12]),
            email: format!("test_{}@example.com", &suffix[..12]),
            password_hash: hash_password("test_password_1")?,
            first_name: Some("Test".to_string()),
            last_name: None,
        },
    )
    .await?;

    Ok(user)
}

/// Builds an authenticated JSON request
pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");

    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }

    builder
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .expect("request build failed")
}

/// Reads a response body into JSON
pub async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read failed");
    serde_json::from_slice(&body).expect("body was not valid JSON")
}
