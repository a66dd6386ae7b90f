//! Public Profile Projections
//!
//! Member lists are rendered with display fields (username, avatar URL)
//! joined from the `users` table. Account management itself belongs to
//! the identity collaborator; this module only reads the mirrored
//! projection and tolerates missing rows by falling back to the bare id.

use crate::backend::error::ApiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Display fields for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    pub profile_url: Option<String>,
}

impl UserProfile {
    /// Fallback projection when the identity mirror has no row
    pub fn bare(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            profile_url: None,
        }
    }
}

/// Profile lookup seam
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError>;
}

/// Postgres-backed profile store
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn fetch(&self, user_id: &str) -> Result<Option<UserProfile>, ApiError> {
        #[derive(sqlx::FromRow)]
        struct ProfileRow {
            user_id: String,
            username: String,
            profile_url: Option<String>,
        }

        let row = sqlx::query_as::<_, ProfileRow>(
            r#"SELECT user_id, username, profile_url FROM users WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserProfile {
            user_id: row.user_id,
            username: row.username,
            profile_url: row.profile_url,
        }))
    }
}
