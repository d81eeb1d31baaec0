/// Integration tests for the TaskDeck API
///
/// These tests verify the full system end-to-end:
/// - Registration, login, and refresh-token rotation
/// - Task CRUD with ownership isolation
/// - Cache invalidation on task writes
/// - Reminder window semantics (5/10-minute exact match)
/// - Expired-token cleanup
/// - Rate limiting
///
/// All tests require live PostgreSQL and Redis instances and are ignored by
/// default. Run with:
/// cargo test -p taskdeck-api --test integration_test -- --ignored --test-threads=1

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;
use std::sync::Arc;
use taskdeck_shared::models::task::{CreateTask, Task, TaskStatus};
use taskdeck_shared::models::token::{BlacklistedToken, OutstandingToken};
use taskdeck_shared::time::truncate_to_minute;
use taskdeck_worker::mailer::MockMailer;
use taskdeck_worker::reminder::ReminderJob;
use taskdeck_worker::token_cleanup::TokenCleanupJob;
use tower::ServiceExt as _;
use uuid::Uuid;

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_register_login_refresh_flow() {
    let ctx = TestContext::new().await.unwrap();

    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("flow_{}", &suffix[..12]);

    // Register
    let request = common::json_request(
        "POST",
        "/register",
        None,
        Some(
            json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "strong_enough_1",
            })
            .to_string(),
        ),
    );
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::response_json(response).await;
    assert!(body["access"].is_string());
    assert!(body["refresh"].is_string());

    // Login
    let request = common::json_request(
        "POST",
        "/login",
        None,
        Some(json!({ "username": username, "password": "strong_enough_1" }).to_string()),
    );
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::response_json(response).await;
    let refresh_token = body["refresh"].as_str().unwrap().to_string();

    // Refresh rotates
    let request = common::json_request(
        "POST",
        "/token/refresh",
        None,
        Some(json!({ "refresh": refresh_token }).to_string()),
    );
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The old refresh token is now blacklisted and must be rejected
    let request = common::json_request(
        "POST",
        "/token/refresh",
        None,
        Some(json!({ "refresh": refresh_token }).to_string()),
    );
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_wrong_password_is_generic_401() {
    let ctx = TestContext::new().await.unwrap();

    let request = common::json_request(
        "POST",
        "/login",
        None,
        Some(json!({ "username": ctx.user.username, "password": "wrong_password_1" }).to_string()),
    );
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = common::response_json(response).await;
    assert_eq!(body["message"], "Invalid username or password");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_task_ownership_isolation() {
    let ctx = TestContext::new().await.unwrap();

    // Another user's task
    let other = common::create_test_user(&ctx.db).await.unwrap();
    let foreign_task = Task::create(
        &ctx.db,
        CreateTask {
            user_id: other.id,
            title: "not yours".to_string(),
            description: "private".to_string(),
            status: TaskStatus::Pending,
            due_date: Utc::now() + Duration::hours(1),
        },
    )
    .await
    .unwrap();

    // Read, update, and delete must all report 404
    for (method, body) in [
        ("GET", None),
        ("PATCH", Some(json!({"title": "hijacked"}).to_string())),
        ("DELETE", None),
    ] {
        let request = common::json_request(
            method,
            &format!("/tasks/{}", foreign_task.id),
            Some(&ctx.auth_header()),
            body,
        );
        let response = ctx.app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::NOT_FOUND,
            "{} on a foreign task must 404",
            method
        );
    }

    // The task is untouched
    let still_there = Task::find_by_id_and_user(&ctx.db, foreign_task.id, other.id)
        .await
        .unwrap();
    assert!(still_there.is_some());
    assert_eq!(still_there.unwrap().title, "not yours");

    taskdeck_shared::models::user::User::delete(&ctx.db, other.id)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_delete_invalidates_task_list_cache() {
    let ctx = TestContext::new().await.unwrap();

    let task = Task::create(
        &ctx.db,
        CreateTask {
            user_id: ctx.user.id,
            title: "to be deleted".to_string(),
            description: "ephemeral".to_string(),
            status: TaskStatus::Pending,
            due_date: Utc::now() + Duration::hours(1),
        },
    )
    .await
    .unwrap();

    // First list populates the cache
    let request = common::json_request("GET", "/tasks", Some(&ctx.auth_header()), None);
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::response_json(response).await;
    assert_eq!(body["count"], 1);

    // Delete invalidates
    let request = common::json_request(
        "DELETE",
        &format!("/tasks/{}", task.id),
        Some(&ctx.auth_header()),
        None,
    );
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Subsequent list reflects the deletion
    let request = common::json_request("GET", "/tasks", Some(&ctx.auth_header()), None);
    let response = ctx.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::response_json(response).await;
    assert_eq!(body["count"], 0);
    assert!(body["results"].as_array().unwrap().is_empty());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_reminder_window_exact_match() {
    let ctx = TestContext::new().await.unwrap();

    let now = truncate_to_minute(Utc::now());

    // Due in exactly 5 minutes: triggers
    Task::create(
        &ctx.db,
        CreateTask {
            user_id: ctx.user.id,
            title: "due in five".to_string(),
            description: "d".to_string(),
            status: TaskStatus::Pending,
            due_date: now + Duration::minutes(5),
        },
    )
    .await
    .unwrap();

    // Due in 6 minutes: must not trigger
    Task::create(
        &ctx.db,
        CreateTask {
            user_id: ctx.user.id,
            title: "due in six".to_string(),
            description: "d".to_string(),
            status: TaskStatus::Pending,
            due_date: now + Duration::minutes(6),
        },
    )
    .await
    .unwrap();

    let mailer = Arc::new(MockMailer::new());
    let job = ReminderJob::new(ctx.db.clone(), mailer.clone());

    let stats = job.run_once(now).await.unwrap();

    assert_eq!(stats.sent, 1);
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, ctx.user.email);
    assert!(sent[0].text_body.contains("due in five"));

    // A second run for the same minute sends again only because the task is
    // still in the window; running one minute later must not match the
    // 6-minute task either (it is then exactly 5 minutes out and does match)
    let stats_next = job.run_once(now + Duration::minutes(1)).await.unwrap();
    assert_eq!(stats_next.sent, 1);
    assert!(mailer.sent()[1].text_body.contains("due in six"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_token_cleanup_moves_expired_to_blacklist() {
    let ctx = TestContext::new().await.unwrap();

    let expired_jti = Uuid::new_v4();
    let live_jti = Uuid::new_v4();

    OutstandingToken::record(
        &ctx.db,
        ctx.user.id,
        expired_jti,
        Utc::now() - Duration::hours(1),
    )
    .await
    .unwrap();
    OutstandingToken::record(&ctx.db, ctx.user.id, live_jti, Utc::now() + Duration::hours(12))
        .await
        .unwrap();

    let job = TokenCleanupJob::new(ctx.db.clone());
    let stats = job.run_once(Utc::now()).await.unwrap();

    assert_eq!(stats.retired, 1);
    assert_eq!(stats.failed, 0);

    // Expired token left the outstanding set and entered the blacklist
    assert!(OutstandingToken::find_by_jti(&ctx.db, expired_jti)
        .await
        .unwrap()
        .is_none());
    assert!(BlacklistedToken::is_blacklisted(&ctx.db, expired_jti)
        .await
        .unwrap());

    // Live token untouched
    assert!(OutstandingToken::find_by_jti(&ctx.db, live_jti)
        .await
        .unwrap()
        .is_some());
    assert!(!BlacklistedToken::is_blacklisted(&ctx.db, live_jti)
        .await
        .unwrap());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL and Redis
async fn test_rate_limit_returns_fixed_429() {
    let ctx = TestContext::new().await.unwrap();

    // Same client address for every attempt so they share a bucket
    let addr = format!("10.1.2.{}", rand_octet());
    let mut throttled = None;

    for _ in 0..60 {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .header("x-forwarded-for", &addr)
            .body(axum::body::Body::from(
                serde_json::json!({ "username": "nobody", "password": "nothing1" }).to_string(),
            ))
            .unwrap();

        let response = ctx.app.clone().oneshot(request).await.unwrap();
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            throttled = Some(response);
            break;
        }
    }

    let response = throttled.expect("rate limit never triggered within 60 requests");
    assert!(response.headers().contains_key("Retry-After"));

    let body = common::response_json(response).await;
    assert_eq!(body["message"], "Rate limit exceeded. Please try again later");

    ctx.cleanup().await.unwrap();
}

/// Pseudo-random final octet so repeated test runs use fresh buckets
fn rand_octet() -> u8 {
    (Uuid::new_v4().as_bytes()[0] % 250) + 1
}
