/// Middleware modules for the API server
///
/// - `rate_limit`: Redis-backed request throttling
/// - `security`: security response headers

pub mod rate_limit;
pub mod security;
