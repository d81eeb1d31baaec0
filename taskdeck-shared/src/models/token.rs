/// Refresh-token lifecycle models
///
/// Every issued refresh token is recorded as an outstanding row keyed by its
/// `jti` claim. Revoked tokens (after rotation, or after expiry cleanup)
/// move to the blacklist. Refresh validation requires the jti to be
/// outstanding and not blacklisted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE outstanding_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     jti UUID NOT NULL UNIQUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
///
/// CREATE TABLE blacklisted_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     jti UUID NOT NULL UNIQUE,
///     user_id UUID NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     blacklisted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// The blacklist deliberately has no foreign key to the outstanding table:
/// a blacklist record must survive deletion of the outstanding row it was
/// created from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// An issued, not-yet-revoked refresh token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutstandingToken {
    /// Row ID
    pub id: Uuid,

    /// User the token was issued to
    pub user_id: Uuid,

    /// JWT ID claim of the refresh token
    pub jti: Uuid,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// When the token expires
    pub expires_at: DateTime<Utc>,
}

/// A revoked refresh token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlacklistedToken {
    /// Row ID
    pub id: Uuid,

    /// JWT ID claim of the revoked token
    pub jti: Uuid,

    /// User the token was issued to
    pub user_id: Uuid,

    /// When the token would have expired
    pub expires_at: DateTime<Utc>,

    /// When the token was blacklisted
    pub blacklisted_at: DateTime<Utc>,
}

impl OutstandingToken {
    /// Records a freshly issued refresh token
    pub async fn record(
        pool: &PgPool,
        user_id: Uuid,
        jti: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, OutstandingToken>(
            r#"
            INSERT INTO outstanding_tokens (user_id, jti, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, jti, created_at, expires_at
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    /// Finds an outstanding token by its jti
    pub async fn find_by_jti(pool: &PgPool, jti: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, OutstandingToken>(
            r#"
            SELECT id, user_id, jti, created_at, expires_at
            FROM outstanding_tokens
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Lists all outstanding tokens that expired before `now`
    pub async fn list_expired(
        pool: &PgPool,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tokens = sqlx::query_as::<_, OutstandingToken>(
            r#"
            SELECT id, user_id, jti, created_at, expires_at
            FROM outstanding_tokens
            WHERE expires_at < $1
            ORDER BY expires_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(pool)
        .await?;

        Ok(tokens)
    }

    /// Retires a token: inserts a blacklist record and deletes the
    /// outstanding row in a single transaction
    ///
    /// Used both for rotation (old token revoked when a new pair is issued)
    /// and for expiry cleanup. Atomicity guarantees a token is never deleted
    /// without a blacklist entry, or blacklisted while still outstanding.
    ///
    /// The blacklist insert tolerates an already-present jti, so retrying a
    /// partially observed failure is safe.
    pub async fn retire(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO blacklisted_tokens (jti, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(self.jti)
        .bind(self.user_id)
        .bind(self.expires_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM outstanding_tokens WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Counts outstanding tokens for a user
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM outstanding_tokens WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

impl BlacklistedToken {
    /// Checks whether a jti has been blacklisted
    pub async fn is_blacklisted(pool: &PgPool, jti: Uuid) -> Result<bool, sqlx::Error> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM blacklisted_tokens WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Finds a blacklisted token by its jti
    pub async fn find_by_jti(pool: &PgPool, jti: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, BlacklistedToken>(
            r#"
            SELECT id, jti, user_id, expires_at, blacklisted_at
            FROM blacklisted_tokens
            WHERE jti = $1
            "#,
        )
        .bind(jti)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Deletes blacklist rows whose token expiry is older than `cutoff`
    ///
    /// Keeps the blacklist bounded. The cutoff is typically `now` minus a
    /// retention window, so recently retired tokens stay visible.
    ///
    /// # Returns
    ///
    /// Number of rows removed.
    pub async fn purge_expired_before(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blacklisted_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outstanding_token_struct() {
        let token = OutstandingToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            jti: Uuid::new_v4(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::hours(12),
        };

        assert!(token.expires_at > token.created_at);
    }

    // Integration tests for the retire/cleanup flow are in the worker crate
}
