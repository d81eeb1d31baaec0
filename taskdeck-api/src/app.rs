/// Application state and router builder
///
/// Defines the shared application state and builds the axum router with all
/// routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::{app::{AppState, build_router}, config::Config};
/// use taskdeck_shared::cache::{CacheClient, CacheConfig};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let cache = CacheClient::new(CacheConfig::from_env()?).await?;
///
/// let state = AppState::new(pool, cache, config);
/// let app = build_router(state);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdeck_shared::auth::middleware::bearer_auth;
use taskdeck_shared::cache::CacheClient;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via axum's `State` extractor. All fields
/// are cheap to clone (pool and cache are handle types, config is Arc'd).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Redis cache client
    pub cache: CacheClient,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, cache: CacheClient, config: Config) -> Self {
        Self {
            db,
            cache,
            config: Arc::new(config),
        }
    }

    /// Gets the JWT signing secret
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /
/// ├── GET  /health              # Health check (public, unthrottled)
/// ├── POST /register            # Create account (throttled per address)
/// ├── POST /login               # Obtain token pair
/// ├── POST /token/refresh       # Rotate refresh token
/// ├── GET  /users/me            # Cached profile read (authenticated)
/// ├── PATCH /users/me           # Profile update
/// ├── GET  /tasks               # Cached, paginated list
/// ├── POST /tasks               # Create task
/// └── GET/PATCH/DELETE /tasks/:id
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing; per-route
/// Bearer auth and rate limiting (auth runs before the limiter so
/// authenticated requests are throttled per user, not per address).
pub fn build_router(state: AppState) -> Router {
    use crate::middleware::rate_limit;
    use crate::routes;

    // Health check (public, no throttling)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Anonymous auth routes, throttled per client address
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/token/refresh", post(routes::auth::refresh))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_layer,
        ));

    // Authenticated routes, throttled per user
    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(routes::users::get_profile).patch(routes::users::update_profile),
        )
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_layer,
        ))
        .layer(axum::middleware::from_fn(bearer_auth(
            state.jwt_secret().to_string(),
        )));

    // CORS: permissive in debug, locked down otherwise
    let cors = if state.config.api.debug {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
    };

    let enable_hsts = !state.config.api.debug;

    Router::new()
        .merge(health_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(enable_hsts))
        .with_state(state)
}
