//! Credential store: one trait, a durable SQLite backend and a volatile
//! in-memory backend.

mod memory;
mod repo;
mod repo_types;
mod sqlite;

pub use memory::MemoryUserStore;
pub use repo::{StoreError, UserStore};
pub use repo_types::{NewUser, User};
pub use sqlite::SqliteUserStore;

#[cfg(test)]
pub(crate) mod contract;
