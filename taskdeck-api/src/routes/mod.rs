/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health check endpoint
/// - `auth`: registration, login, refresh-token rotation
/// - `users`: profile read/update (cache-aside)
/// - `tasks`: task CRUD with cached, paginated listing

pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;
