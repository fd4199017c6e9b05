use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use tracing::{info, warn};

use crate::auth::{password::CredentialHasher, session::SessionKeys};
use crate::config::{AppConfig, StoreBackend};
use crate::users::{MemoryUserStore, SqliteUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub hasher: CredentialHasher,
    pub session_keys: SessionKeys,
}

impl AppState {
    pub async fn init(config: &AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match config.store_backend {
            StoreBackend::Sqlite => {
                info!(database_url = %config.database_url, "using sqlite user store");
                Arc::new(SqliteUserStore::connect(&config.database_url).await?)
            }
            StoreBackend::Memory => {
                warn!("using in-memory user store; users are lost on restart");
                Arc::new(MemoryUserStore::new())
            }
        };
        store
            .ensure_schema()
            .await
            .context("prepare user store schema")?;

        Self::from_parts(store, config)
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: &AppConfig) -> anyhow::Result<Self> {
        if config.uses_default_secret() {
            warn!("SECRET_KEY is not set; session cookies are signed with the default key");
        }
        let hasher = CredentialHasher::new(config.pbkdf2_rounds).context("init password hasher")?;
        let session_keys = SessionKeys::new(&config.session);
        Ok(Self {
            store,
            hasher,
            session_keys,
        })
    }
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        state.session_keys.clone()
    }
}

#[cfg(test)]
impl AppState {
    /// Memory-backed state with cheap hashing.
    pub fn fake() -> Self {
        use crate::config::SessionConfig;

        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            store_backend: StoreBackend::Memory,
            session: SessionConfig {
                secret_key: "test-secret".into(),
                cookie_name: "user_platform_session".into(),
                cookie_secure: false,
            },
            pbkdf2_rounds: 1_000,
            host: "127.0.0.1".into(),
            port: 0,
        };
        Self::from_parts(Arc::new(MemoryUserStore::new()), &config).expect("fake state")
    }
}
