//! Domain model structs persisted in the directory database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the view layer as JSON.  Privacy enforcement does NOT happen
//! here: these are the raw stored rows.  Only the projection in
//! `annuaire-directory` may leave this crate's boundary toward a viewer.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use annuaire_shared::{IdentityId, PrivacyLevel, ProfileId, ProviderType, UserId, VouchId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An auth account.  Exactly one [`Profile`] exists per user; it is created
/// in the same transaction as the user row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Login / fallback contact email.  Kept in sync with the primary
    /// identity link when a high-assurance provider is linked.
    pub email: String,
    pub is_superuser: bool,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A member profile with per-field privacy settings.
///
/// Each privacy-controlled attribute is paired with exactly one
/// `privacy_<attr>` level.  `email` is the one synthetic member of that set:
/// it has no stored column here and is resolved through the profile's
/// identity links, but `privacy_email` still gates the stored fallback.
///
/// `is_vouched` and `can_vouch` are derived from the vouch graph and must
/// only change through the flag recompute in the vouches module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub full_name: String,
    pub title: String,
    pub bio: String,
    pub city: String,
    pub country: String,
    /// When the member first got involved, if they chose to record it.
    pub date_member: Option<NaiveDate>,
    pub is_vouched: bool,
    pub can_vouch: bool,
    pub privacy_full_name: PrivacyLevel,
    pub privacy_title: PrivacyLevel,
    pub privacy_bio: PrivacyLevel,
    pub privacy_city: PrivacyLevel,
    pub privacy_country: PrivacyLevel,
    pub privacy_date_member: PrivacyLevel,
    pub privacy_email: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh profile for a newly created user, every field empty and every
    /// privacy level at the default.
    pub fn new_for_user(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: ProfileId::new(),
            user_id,
            full_name: String::new(),
            title: String::new(),
            bio: String::new(),
            city: String::new(),
            country: String::new(),
            date_member: None,
            is_vouched: false,
            can_vouch: false,
            privacy_full_name: PrivacyLevel::DEFAULT,
            privacy_title: PrivacyLevel::DEFAULT,
            privacy_bio: PrivacyLevel::DEFAULT,
            privacy_city: PrivacyLevel::DEFAULT,
            privacy_country: PrivacyLevel::DEFAULT,
            privacy_date_member: PrivacyLevel::DEFAULT,
            privacy_email: PrivacyLevel::DEFAULT,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.full_name
    }

    /// A profile is complete once it has a display name.
    pub fn is_complete(&self) -> bool {
        !self.full_name.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Identity link
// ---------------------------------------------------------------------------

/// An identity-provider identity attached to a profile.
///
/// At most one link per profile carries `is_primary_contact` (the address
/// shown to others) and at most one carries `is_primary` (the login
/// identity).  Both invariants are enforced transactionally by the
/// identities module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityLink {
    pub id: IdentityId,
    pub profile_id: ProfileId,
    pub provider: ProviderType,
    /// IdP subject id, e.g. `github|1234567`.
    pub subject: String,
    pub email: String,
    pub username: String,
    pub is_primary: bool,
    pub is_primary_contact: bool,
    /// Who may see this identity.  Also mirrored onto the profile's
    /// `privacy_email` while this link is the primary contact.
    pub privacy: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// External account
// ---------------------------------------------------------------------------

/// Category of an [`ExternalAccount`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountKind {
    /// Alternate email address.
    Email,
    /// Personal website.
    Website,
    /// Any other service account (forge, chat, ...).
    Service,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Website => "WEBSITE",
            Self::Service => "SERVICE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "EMAIL" => Some(Self::Email),
            "WEBSITE" => Some(Self::Website),
            "SERVICE" => Some(Self::Service),
            _ => None,
        }
    }
}

/// A non-IdP account a member chose to list, with its own privacy level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalAccount {
    pub id: Uuid,
    pub profile_id: ProfileId,
    pub kind: AccountKind,
    pub identifier: String,
    pub privacy: PrivacyLevel,
}

// ---------------------------------------------------------------------------
// Vouch
// ---------------------------------------------------------------------------

/// An endorsement edge in the vouch graph.
///
/// `voucher_id` is nullable: the edge survives deletion of the voucher's
/// profile (the foreign key sets it to NULL).  Automatic vouches never have
/// a voucher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vouch {
    pub id: VouchId,
    pub vouchee_id: ProfileId,
    pub voucher_id: Option<ProfileId>,
    pub description: String,
    pub autovouch: bool,
    pub date: DateTime<Utc>,
}
