//! # annuaire-directory
//!
//! The read side of the Annuaire member directory: privacy-aware projection
//! of profiles and trust resolution over the vouch graph.
//!
//! The view layer never touches stored rows directly; it goes through
//! [`Directory::projected_profile`], which computes the viewer's clearance,
//! loads a consistent snapshot and returns a [`ProjectedProfile`] with every
//! field the viewer may not see replaced by its hidden default.

pub mod fields;
pub mod projection;
pub mod resolver;

pub use fields::ProfileField;
pub use projection::{project, ProfileSnapshot, ProjectedProfile, VouchEdge};
pub use resolver::{effective_clearance, Directory, ViewAs};
