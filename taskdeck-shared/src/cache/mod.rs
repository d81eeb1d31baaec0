/// Redis cache layer
///
/// - `client`: connection-manager wrapper with env config and health checks
/// - `store`: cache-aside helpers (JSON payloads, fixed TTL, key builders)

pub mod client;
pub mod store;

pub use client::{CacheClient, CacheConfig, CacheError};
