/// Cache-aside helpers
///
/// Response payloads are cached as serialized JSON under per-user keys with
/// a fixed TTL. Reads check the cache first and populate it on miss; any
/// write to the owning entity deletes the corresponding key before the
/// response is returned.
///
/// Cache failures are surfaced as errors here; callers treat them as
/// advisory and fall through to the database, so the cache is never a
/// correctness dependency.
///
/// # Keys
///
/// - `user_details_{user_id}`: serialized profile response
/// - `task_list_{user_id}`: serialized paginated task-list response

use redis::AsyncCommands;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::client::{CacheClient, CacheError};

/// Fixed TTL for cached payloads (1 hour)
pub const CACHE_TTL_SECONDS: u64 = 60 * 60;

/// Cache key for a user's profile payload
pub fn user_details_key(user_id: Uuid) -> String {
    format!("user_details_{}", user_id)
}

/// Cache key for a user's task-list payload
pub fn task_list_key(user_id: Uuid) -> String {
    format!("task_list_{}", user_id)
}

/// Fetches a cached JSON payload
///
/// # Returns
///
/// The payload if present, None on a miss.
///
/// # Errors
///
/// Returns an error if the Redis command fails or the cached bytes are not
/// valid JSON.
pub async fn get_json(client: &CacheClient, key: &str) -> Result<Option<JsonValue>, CacheError> {
    let mut conn = client.connection();

    let raw: Option<String> = conn.get(key).await?;

    match raw {
        Some(s) => {
            let value = serde_json::from_str(&s)
                .map_err(|e| CacheError::SerializationError(e.to_string()))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Stores a JSON payload with the fixed TTL
pub async fn set_json(
    client: &CacheClient,
    key: &str,
    value: &JsonValue,
) -> Result<(), CacheError> {
    let mut conn = client.connection();

    let raw =
        serde_json::to_string(value).map_err(|e| CacheError::SerializationError(e.to_string()))?;

    let _: () = redis::cmd("SET")
        .arg(key)
        .arg(raw)
        .arg("EX")
        .arg(CACHE_TTL_SECONDS)
        .query_async(&mut conn)
        .await?;

    Ok(())
}

/// Deletes a cache key (write invalidation)
///
/// Deleting a missing key is not an error.
pub async fn delete(client: &CacheClient, key: &str) -> Result<(), CacheError> {
    let mut conn = client.connection();

    let _: () = conn.del(key).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();

        assert_eq!(
            user_details_key(id),
            "user_details_550e8400-e29b-41d4-a716-446655440000"
        );
        assert_eq!(
            task_list_key(id),
            "task_list_550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_keys_are_distinct_per_user() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_ne!(user_details_key(a), user_details_key(b));
        assert_ne!(task_list_key(a), task_list_key(b));
        assert_ne!(user_details_key(a), task_list_key(a));
    }

    #[test]
    fn test_ttl_is_one_hour() {
        assert_eq!(CACHE_TTL_SECONDS, 3600);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_set_get_delete_roundtrip() {
        use crate::cache::client::{CacheClient, CacheConfig};

        let client = CacheClient::new(CacheConfig::default_for_test())
            .await
            .unwrap();

        let key = format!("test_{}", Uuid::new_v4());
        let payload = serde_json::json!({"count": 1, "results": []});

        set_json(&client, &key, &payload).await.unwrap();
        let cached = get_json(&client, &key).await.unwrap();
        assert_eq!(cached, Some(payload));

        delete(&client, &key).await.unwrap();
        let gone = get_json(&client, &key).await.unwrap();
        assert!(gone.is_none());
    }
}
