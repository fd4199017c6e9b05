use axum::http::{HeaderValue, Uri};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    auth::{
        dto::RegisterForm,
        password::{CredentialHasher, PasswordError},
    },
    users::{NewUser, StoreError, User, UserStore},
};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_BYTES: usize = 4096;
pub const MAX_USERNAME_CHARS: usize = 128;
pub const MAX_EMAIL_CHARS: usize = 256;

/// Registration failures, worded for the user.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Username and password are required.")]
    MissingFields,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Password must be at least 8 characters.")]
    PasswordTooShort,
    #[error("Password is too long.")]
    PasswordTooLong,
    #[error("Username is too long.")]
    UsernameTooLong,
    #[error("Invalid email address.")]
    InvalidEmail,
    #[error("A user with that name already exists.")]
    UsernameTaken,
    #[error("Could not create user. Try a different username.")]
    InsertConflict,
    #[error(transparent)]
    Store(StoreError),
    #[error(transparent)]
    Hash(#[from] PasswordError),
}

impl RegisterError {
    /// Input problems the user can fix, as opposed to server faults.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Hash(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Normalised registration input.
#[derive(Debug)]
pub struct ValidRegistration {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
}

pub fn validate_registration(form: RegisterForm) -> Result<ValidRegistration, RegisterError> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    if username.is_empty() || form.password.is_empty() {
        return Err(RegisterError::MissingFields);
    }
    if form.password != form.password2 {
        return Err(RegisterError::PasswordMismatch);
    }
    if form.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(RegisterError::PasswordTooShort);
    }
    // byte length, not chars; never truncate before hashing
    if form.password.len() > MAX_PASSWORD_BYTES {
        return Err(RegisterError::PasswordTooLong);
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(RegisterError::UsernameTooLong);
    }
    if !email.is_empty() && (email.chars().count() > MAX_EMAIL_CHARS || !is_valid_email(&email)) {
        return Err(RegisterError::InvalidEmail);
    }

    Ok(ValidRegistration {
        username,
        email: (!email.is_empty()).then_some(email),
        password: form.password,
    })
}

/// Validates, hashes and stores a new user.
pub async fn register_user(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    form: RegisterForm,
) -> Result<User, RegisterError> {
    let input = validate_registration(form)?;

    if store
        .find_by_username(&input.username)
        .await
        .map_err(RegisterError::Store)?
        .is_some()
    {
        return Err(RegisterError::UsernameTaken);
    }

    let password_hash = hasher.hash(&input.password)?;
    let new_user = NewUser {
        username: input.username,
        email: input.email,
        password_hash,
    };

    match store.insert(new_user).await {
        Ok(user) => Ok(user),
        // lost a race against a concurrent registration
        Err(StoreError::DuplicateUsername(name)) => {
            warn!(username = %name, "duplicate username on insert");
            Err(RegisterError::InsertConflict)
        }
        Err(e) => Err(RegisterError::Store(e)),
    }
}

/// Resolves a username/password pair to a user. Unknown users and wrong
/// passwords produce the same error.
pub async fn authenticate(
    store: &dyn UserStore,
    hasher: &CredentialHasher,
    username: &str,
    password: &str,
) -> Result<User, LoginError> {
    let Some(user) = store.find_by_username(username).await? else {
        hasher.verify_dummy(password);
        debug!(username = %username, "login for unknown user");
        return Err(LoginError::InvalidCredentials);
    };

    match hasher.verify(password, &user.password_hash) {
        Ok(true) => Ok(user),
        Ok(false) => {
            debug!(user_id = user.id, "login with wrong password");
            Err(LoginError::InvalidCredentials)
        }
        Err(e) => {
            warn!(error = %e, user_id = user.id, "stored password hash is unreadable");
            Err(LoginError::InvalidCredentials)
        }
    }
}

/// Only same-origin paths are accepted as a post-login destination. The
/// value ends up verbatim in a `Location` header, so anything a browser
/// would strip or reinterpret (whitespace, control bytes, backslashes) is
/// refused outright.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?;
    if !next.starts_with('/')
        || next.starts_with("//")
        || next
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || c == '\\')
    {
        return None;
    }

    let uri: Uri = next.parse().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() || uri.path().starts_with("//") {
        return None;
    }
    HeaderValue::from_str(next).ok()?;
    Some(next)
}
