//! Viewer clearance resolution and the directory façade.
//!
//! [`effective_clearance`] maps a viewer's account and trust state to the
//! single [`PrivacyLevel`] they hold; [`Directory`] wires that resolution to
//! the store so callers get projected profiles without ever touching raw
//! rows.

use annuaire_shared::{DirectoryConfig, IdentityId, PrivacyLevel, ProfileId, VouchId};
use annuaire_store::{Database, IdentityLink, Profile, Result, StoreError, User, Vouch};

use crate::projection::{self, ProfileSnapshot, ProjectedProfile, VouchEdge};

/// The privacy clearance a viewer holds toward other members' profiles.
///
/// Superusers see everything, staff see up to the employees tier, vouched
/// members the members tier, everyone else only public data.
pub fn effective_clearance(user: &User, profile: &Profile) -> PrivacyLevel {
    if user.is_superuser {
        PrivacyLevel::Private
    } else if user.is_staff {
        PrivacyLevel::Employees
    } else if profile.is_vouched {
        PrivacyLevel::Members
    } else {
        PrivacyLevel::Public
    }
}

/// Preview clearance a member may apply to their own profile, to check what
/// a given audience would see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAs {
    Anonymous,
    Member,
    Employee,
    Private,
    /// No restriction, the owner's normal view.
    Myself,
}

impl ViewAs {
    pub fn clearance(self) -> Option<PrivacyLevel> {
        match self {
            Self::Anonymous => Some(PrivacyLevel::Public),
            Self::Member => Some(PrivacyLevel::Members),
            Self::Employee => Some(PrivacyLevel::Employees),
            Self::Private => Some(PrivacyLevel::Private),
            Self::Myself => None,
        }
    }
}

/// High-level entry point over the store: snapshot loading, viewer-aware
/// projection and the vouch and identity operations with the configured
/// limits applied.
pub struct Directory<'a> {
    db: &'a mut Database,
    config: DirectoryConfig,
}

impl<'a> Directory<'a> {
    pub fn new(db: &'a mut Database, config: DirectoryConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Load everything the projection needs about one profile.
    pub fn load_snapshot(&self, profile_id: ProfileId) -> Result<ProfileSnapshot> {
        let db: &Database = &*self.db;
        let profile = db.get_profile(profile_id)?;
        let user = db.get_user(profile.user_id)?;
        let identities = db.identities_for_profile(profile_id)?;
        let accounts = db.external_accounts_for_profile(profile_id)?;

        let vouches_received = self.edges(db.vouches_received(profile_id)?, |v| v.voucher_id)?;
        let vouches_made = self.edges(db.vouches_made(profile_id)?, |v| Some(v.vouchee_id))?;

        Ok(ProfileSnapshot {
            profile,
            user,
            identities,
            accounts,
            vouches_received,
            vouches_made,
        })
    }

    fn edges(
        &self,
        vouches: Vec<Vouch>,
        counterpart_of: impl Fn(&Vouch) -> Option<ProfileId>,
    ) -> Result<Vec<VouchEdge>> {
        let db: &Database = &*self.db;
        vouches
            .into_iter()
            .map(|vouch| {
                let counterpart = match counterpart_of(&vouch) {
                    Some(id) => match db.get_profile(id) {
                        Ok(profile) => Some(profile),
                        Err(StoreError::NotFound) => None,
                        Err(e) => return Err(e),
                    },
                    None => None,
                };
                Ok(VouchEdge { vouch, counterpart })
            })
            .collect()
    }

    /// Project `profile_id` for `viewer`.
    ///
    /// `viewer` of `None` is internal access and sees everything.  A member
    /// viewing their own profile also sees everything unless they asked for
    /// a [`ViewAs`] preview; previews are never honored on someone else's
    /// profile.
    pub fn projected_profile(
        &self,
        profile_id: ProfileId,
        viewer: Option<ProfileId>,
        view_as: Option<ViewAs>,
    ) -> Result<ProjectedProfile> {
        let snapshot = self.load_snapshot(profile_id)?;

        let clearance = match viewer {
            None => None,
            Some(viewer_id) if viewer_id == profile_id => {
                view_as.and_then(ViewAs::clearance)
            }
            Some(viewer_id) => {
                let db: &Database = &*self.db;
                let viewer_profile = db.get_profile(viewer_id)?;
                let viewer_user = db.get_user(viewer_profile.user_id)?;
                Some(effective_clearance(&viewer_user, &viewer_profile))
            }
        };

        tracing::debug!(profile = %profile_id, clearance = ?clearance, "projecting profile");
        Ok(projection::project(&snapshot, clearance))
    }

    /// Record a vouch under the configured limits.
    pub fn vouch(
        &mut self,
        vouchee: ProfileId,
        voucher: Option<ProfileId>,
        description: &str,
    ) -> Result<Vouch> {
        self.db.vouch(vouchee, voucher, description, &self.config)
    }

    pub fn unvouch(&mut self, id: VouchId) -> Result<bool> {
        self.db.unvouch(id, &self.config)
    }

    pub fn auto_vouch(&mut self, profile: ProfileId) -> Result<Option<Vouch>> {
        self.db.auto_vouch(profile, &self.config)
    }

    /// Attach an IdP identity and apply the staff-domain autovouch when the
    /// verified address qualifies.
    pub fn register_identity(
        &mut self,
        profile_id: ProfileId,
        subject: &str,
        email: &str,
        username: &str,
        privacy: PrivacyLevel,
    ) -> Result<IdentityLink> {
        let link = self
            .db
            .link_identity(profile_id, subject, email, username, privacy)?;
        self.db
            .auto_vouch_if_staff_domain(profile_id, email, &self.config)?;
        Ok(link)
    }

    pub fn remove_identity(&mut self, id: IdentityId) -> Result<()> {
        self.db.delete_identity(id)
    }

    pub fn set_primary_contact(&mut self, id: IdentityId) -> Result<IdentityLink> {
        self.db.set_primary_contact(id)
    }
}
