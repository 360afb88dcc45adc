//! Privacy-aware projection of a profile for a given viewer clearance.
//!
//! [`project`] is a pure function over a [`ProfileSnapshot`]: it never
//! touches the database and never mutates stored state.  The viewer's
//! clearance is an explicit parameter threaded through every resolver; it is
//! not cached on the record and cannot leak between requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use annuaire_shared::{PrivacyLevel, ProfileId};
use annuaire_store::{AccountKind, ExternalAccount, IdentityLink, Profile, User, Vouch};

use crate::fields::{self, ProfileField, PUBLIC_INDEXABLE_FIELDS};

/// A vouch edge together with the profile on the other end.
///
/// `counterpart` is the voucher for received edges and the vouchee for made
/// edges; it is `None` for automatic vouches and when the voucher's profile
/// was deleted.
#[derive(Debug, Clone)]
pub struct VouchEdge {
    pub vouch: Vouch,
    pub counterpart: Option<Profile>,
}

/// Everything the projection needs about one profile, loaded in one go.
#[derive(Debug, Clone)]
pub struct ProfileSnapshot {
    pub profile: Profile,
    pub user: User,
    pub identities: Vec<IdentityLink>,
    pub accounts: Vec<ExternalAccount>,
    pub vouches_received: Vec<VouchEdge>,
    pub vouches_made: Vec<VouchEdge>,
}

/// A profile as a specific viewer is allowed to see it.
///
/// Plain data, serializable for the view layer.  Hidden fields carry their
/// registry default (empty string, `None`), never the stored value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectedProfile {
    pub id: ProfileId,
    pub username: String,
    pub full_name: String,
    pub title: String,
    pub bio: String,
    pub city: String,
    pub country: String,
    pub date_member: Option<NaiveDate>,
    /// Resolved contact email: the primary-contact identity's address when
    /// one is visible, else the gated stored fallback, else empty.
    pub email: String,
    pub is_vouched: bool,
    pub can_vouch: bool,
    /// Whether any public-indexable field is non-empty and exactly public.
    pub is_public_indexable: bool,
    /// Service accounts (everything except emails and websites) the viewer
    /// may see.
    pub accounts: Vec<ExternalAccount>,
    /// Alternate email addresses the viewer may see.
    pub alternate_emails: Vec<ExternalAccount>,
    /// Identity links the viewer may see.
    pub identity_profiles: Vec<IdentityLink>,
    /// The earliest voucher, if that voucher shows at least one field at
    /// this clearance.
    pub vouched_by: Option<ProfileId>,
    pub vouches_received: Vec<Vouch>,
    pub vouches_made: Vec<Vouch>,
}

/// Project `snapshot` for a viewer holding `clearance`.
///
/// `None` means unrestricted access (internal/admin): every field and
/// relation is returned raw.
pub fn project(snapshot: &ProfileSnapshot, clearance: Option<PrivacyLevel>) -> ProjectedProfile {
    let profile = &snapshot.profile;

    let text = |field: ProfileField, value: &str| -> String {
        match clearance {
            Some(c) if c < field.privacy_of(profile) => String::new(),
            _ => value.to_string(),
        }
    };

    let date_member = match clearance {
        Some(c) if c < profile.privacy_date_member => None,
        _ => profile.date_member,
    };

    ProjectedProfile {
        id: profile.id,
        username: snapshot.user.username.clone(),
        full_name: text(ProfileField::FullName, &profile.full_name),
        title: text(ProfileField::Title, &profile.title),
        bio: text(ProfileField::Bio, &profile.bio),
        city: text(ProfileField::City, &profile.city),
        country: text(ProfileField::Country, &profile.country),
        date_member,
        email: resolve_email(snapshot, clearance),
        is_vouched: profile.is_vouched,
        can_vouch: profile.can_vouch,
        is_public_indexable: is_public_indexable(snapshot),
        accounts: filter_accounts(snapshot, clearance, |kind| {
            !matches!(kind, AccountKind::Email | AccountKind::Website)
        }),
        alternate_emails: filter_accounts(snapshot, clearance, |kind| {
            matches!(kind, AccountKind::Email)
        }),
        identity_profiles: snapshot
            .identities
            .iter()
            .filter(|link| visible(link.privacy, clearance))
            .cloned()
            .collect(),
        vouched_by: vouched_by(snapshot, clearance),
        vouches_received: filter_vouches(&snapshot.vouches_received, clearance),
        vouches_made: filter_vouches(&snapshot.vouches_made, clearance),
    }
}

fn visible(privacy: PrivacyLevel, clearance: Option<PrivacyLevel>) -> bool {
    match clearance {
        None => true,
        Some(c) => c >= privacy,
    }
}

fn filter_accounts(
    snapshot: &ProfileSnapshot,
    clearance: Option<PrivacyLevel>,
    keep_kind: impl Fn(AccountKind) -> bool,
) -> Vec<ExternalAccount> {
    snapshot
        .accounts
        .iter()
        .filter(|acct| keep_kind(acct.kind) && visible(acct.privacy, clearance))
        .cloned()
        .collect()
}

/// Resolve the contact email.
///
/// A profile with identity links shows its primary-contact identity's
/// address, gated by that identity's own privacy level.  A profile without
/// links falls back to the stored account email, gated by `privacy_email`.
fn resolve_email(snapshot: &ProfileSnapshot, clearance: Option<PrivacyLevel>) -> String {
    if !snapshot.identities.is_empty() {
        return snapshot
            .identities
            .iter()
            .find(|link| link.is_primary_contact && visible(link.privacy, clearance))
            .map(|link| link.email.clone())
            .unwrap_or_default();
    }

    if visible(snapshot.profile.privacy_email, clearance) {
        snapshot.user.email.clone()
    } else {
        String::new()
    }
}

/// A profile belongs in the public index when any whitelisted field is both
/// non-empty and set to exactly [`PrivacyLevel::Public`].
fn is_public_indexable(snapshot: &ProfileSnapshot) -> bool {
    PUBLIC_INDEXABLE_FIELDS.iter().any(|field| {
        let non_empty = match field {
            ProfileField::FullName => !snapshot.profile.full_name.is_empty(),
            ProfileField::Email => !raw_email(snapshot).is_empty(),
            _ => false,
        };
        non_empty && field.privacy_of(&snapshot.profile) == PrivacyLevel::Public
    })
}

fn raw_email(snapshot: &ProfileSnapshot) -> String {
    resolve_email(snapshot, None)
}

/// The earliest voucher, privacy-checked recursively: a voucher whose own
/// profile shows nothing at this clearance is not revealed.
fn vouched_by(snapshot: &ProfileSnapshot, clearance: Option<PrivacyLevel>) -> Option<ProfileId> {
    let earliest = snapshot
        .vouches_received
        .iter()
        .filter(|edge| edge.counterpart.is_some())
        .min_by_key(|edge| edge.vouch.date)?;

    let voucher = earliest.counterpart.as_ref()?;
    match clearance {
        None => Some(voucher.id),
        Some(c) if fields::any_field_visible_at(voucher, c) => Some(voucher.id),
        Some(_) => None,
    }
}

/// Keep only vouch rows whose counterpart shows at least one field at this
/// clearance.  Edges without a counterpart (autovouches, deleted vouchers)
/// reveal no profile and are always kept.
fn filter_vouches(edges: &[VouchEdge], clearance: Option<PrivacyLevel>) -> Vec<Vouch> {
    edges
        .iter()
        .filter(|edge| match (&edge.counterpart, clearance) {
            (_, None) => true,
            (None, _) => true,
            (Some(counterpart), Some(c)) => fields::any_field_visible_at(counterpart, c),
        })
        .map(|edge| edge.vouch.clone())
        .collect()
}
