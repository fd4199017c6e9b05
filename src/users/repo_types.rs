use sqlx::FromRow;
use time::OffsetDateTime;

pub const STATUS_ACTIVE: &str = "active";

/// User record in the credential store.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                    // assigned by the store, monotonic
    pub username: String,           // unique
    pub email: Option<String>,
    pub password_hash: String,      // PBKDF2 digest, never rendered
    pub created_at: OffsetDateTime,
    pub status: String,
}

/// Insert payload; id, created_at and status are filled in by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
}
