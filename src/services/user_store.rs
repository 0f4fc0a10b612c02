// src/services/user_store.rs
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{error::PersistenceError, services::identity::KakaoProfile};

#[derive(Clone, Debug, PartialEq, Serialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub kakao_id: i64,
    pub nickname: Option<String>,
    pub profile_image: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert-or-update keyed on the provider subject id. Concurrent first
    /// logins for the same subject must yield a single record.
    async fn upsert(&self, profile: &KakaoProfile) -> Result<UserRecord, PersistenceError>;
}

const CREATE_USERS_TABLE: &str = "
CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    kakao_id BIGINT NOT NULL UNIQUE,
    nickname TEXT,
    profile_image TEXT,
    email TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    last_login_at TIMESTAMPTZ NOT NULL DEFAULT now()
)";

const UPSERT_USER: &str = "
INSERT INTO users (id, kakao_id, nickname, profile_image, email, last_login_at)
VALUES ($1, $2, $3, $4, $5, now())
ON CONFLICT (kakao_id) DO UPDATE SET
    nickname = EXCLUDED.nickname,
    profile_image = EXCLUDED.profile_image,
    email = EXCLUDED.email,
    last_login_at = EXCLUDED.last_login_at
RETURNING id, kakao_id, nickname, profile_image, email, created_at, last_login_at";

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Creates the users table if it does not exist yet.
    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn upsert(&self, profile: &KakaoProfile) -> Result<UserRecord, PersistenceError> {
        let record = sqlx::query_as::<_, UserRecord>(UPSERT_USER)
            .bind(Uuid::new_v4())
            .bind(profile.id)
            .bind(profile.nickname())
            .bind(profile.profile_image())
            .bind(profile.email())
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }
}

/// Process-local store used when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<RwLock<HashMap<i64, UserRecord>>>,
}

impl Debug for MemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryUserStore").finish_non_exhaustive()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert(&self, profile: &KakaoProfile) -> Result<UserRecord, PersistenceError> {
        let now = Utc::now();
        // Lookup and insert happen under one write guard.
        let mut guard = self.inner.write().await;
        let record = guard.entry(profile.id).or_insert_with(|| UserRecord {
            id: Uuid::new_v4(),
            kakao_id: profile.id,
            nickname: None,
            profile_image: None,
            email: None,
            created_at: now,
            last_login_at: now,
        });
        record.nickname = profile.nickname().map(String::from);
        record.profile_image = profile.profile_image().map(String::from);
        record.email = profile.email().map(String::from);
        record.last_login_at = now;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn basic_upsert_flow() {
        let store = MemoryUserStore::new();
        assert!(store.is_empty().await);
        let profile = KakaoProfile {
            id: 1,
            ..Default::default()
        };
        let first = store.upsert(&profile).await.unwrap();
        let again = store.upsert(&profile).await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.created_at, again.created_at);
        assert_eq!(store.len().await, 1);
    }
}
