//! Account persistence boundary.
//!
//! An infrastructure-facing abstraction over whatever record store backs the
//! gateway, plus the in-memory (dev/test) and Postgres implementations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;
pub use r#trait::{AccountStore, StoreError};
