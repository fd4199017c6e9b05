use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use time::OffsetDateTime;
use tracing::debug;

use super::repo::{StoreError, UserStore};
use super::repo_types::{NewUser, User, STATUS_ACTIVE};

/// Durable store over the `users` table.
#[derive(Clone)]
pub struct SqliteUserStore {
    db: SqlitePool,
}

impl SqliteUserStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("parse database url `{database_url}`"))?
            .create_if_missing(true);

        // every connection to an in-memory database sees its own empty db
        let pool = if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let db = pool
            .connect_with(options)
            .await
            .context("connect to database")?;

        Ok(Self { db })
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        debug!("users schema up to date");
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, status
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, created_at, status)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, username, email, password_hash, created_at, status
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(OffsetDateTime::now_utc())
        .bind(STATUS_ACTIVE)
        .fetch_one(&self.db)
        .await;

        match created {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateUsername(user.username))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::contract;

    async fn store() -> SqliteUserStore {
        let store = SqliteUserStore::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        store.ensure_schema().await.expect("migrations");
        store
    }

    #[tokio::test]
    async fn insert_then_find() {
        contract::insert_then_find(&store().await).await;
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        contract::duplicate_username_is_rejected(&store().await).await;
    }

    #[tokio::test]
    async fn ids_increase() {
        contract::ids_increase(&store().await).await;
    }

    #[tokio::test]
    async fn unknown_username_is_none() {
        contract::unknown_username_is_none(&store().await).await;
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let store = store().await;
        store.ensure_schema().await.expect("second run");
    }
}
