use anyhow::Context;

pub const DEFAULT_SECRET_KEY: &str = "change-me-in-prod";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" | "db" => Ok(Self::Sqlite),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND `{other}` (expected sqlite or memory)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret_key: String,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub session: SessionConfig,
    pub pbkdf2_rounds: u32,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://dev_db.sqlite3".into());
        let store_backend = std::env::var("STORE_BACKEND")
            .ok()
            .map(|v| v.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or(StoreBackend::Sqlite);

        let session = SessionConfig {
            secret_key: std::env::var("SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET_KEY.into()),
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "user_platform_session".into()),
            cookie_secure: parse_var("SESSION_COOKIE_SECURE", false)?,
        };

        Ok(Self {
            database_url,
            store_backend,
            session,
            pbkdf2_rounds: parse_var("PBKDF2_ROUNDS", 29_000)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("APP_PORT", 5000)?,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.session.secret_key == DEFAULT_SECRET_KEY
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {name}: `{v}`")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parses_known_names() {
        assert_eq!("sqlite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn parse_var_falls_back_to_default_when_unset() {
        let v: u32 = parse_var("AUTH_SERVICE_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(v, 7);
    }
}
