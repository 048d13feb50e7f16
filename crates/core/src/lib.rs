//! `authgate-core` — identifiers and error primitives shared by every crate.
//!
//! This crate contains no storage, transport or crypto concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, ExternalId};
