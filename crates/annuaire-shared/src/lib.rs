//! # annuaire-shared
//!
//! Value types shared by every Annuaire crate: privacy levels, identity
//! provider types, id newtypes and the directory configuration.

pub mod config;
pub mod constants;
pub mod privacy;
pub mod provider;
pub mod types;

pub use config::DirectoryConfig;
pub use privacy::PrivacyLevel;
pub use provider::ProviderType;
pub use types::{IdentityId, ProfileId, UserId, VouchId};
