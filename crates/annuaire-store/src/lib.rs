//! # annuaire-store
//!
//! SQLite-backed persistence for the Annuaire member directory.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed helpers for every domain model:
//! auth users, profiles with per-field privacy settings, identity links,
//! external accounts and the vouch graph.  Every multi-row mutation (vouch
//! plus flag recompute, contact-identity promotion plus sibling demotion)
//! runs inside a single transaction.

pub mod database;
pub mod external_accounts;
pub mod identities;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod users;
pub mod vouches;

mod error;
mod rows;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
