//! The registry of privacy-controlled profile fields.
//!
//! The set is declared statically: every entry pairs a stored attribute with
//! its `privacy_<attr>` level on [`Profile`] and the default shown to
//! viewers who lack the clearance to see the real value.  `Email` is the one
//! synthetic entry: it has no stored column and is resolved through the
//! profile's identity links, but it participates in the visible-field set
//! with default `""`.

use annuaire_shared::PrivacyLevel;
use annuaire_store::Profile;

/// A privacy-controlled field of a [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    FullName,
    Title,
    Bio,
    City,
    Country,
    DateMember,
    /// Synthetic: resolved via identity links, gated by `privacy_email`.
    Email,
}

/// Type-appropriate value substituted for a hidden field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// The empty string.
    EmptyText,
    /// No date recorded.
    NoDate,
}

/// Every privacy-controlled field, in declaration order.
pub const PRIVACY_FIELDS: [ProfileField; 7] = [
    ProfileField::FullName,
    ProfileField::Title,
    ProfileField::Bio,
    ProfileField::City,
    ProfileField::Country,
    ProfileField::DateMember,
    ProfileField::Email,
];

/// Fields that make a profile eligible for the public search index when
/// non-empty and exactly public.
pub const PUBLIC_INDEXABLE_FIELDS: [ProfileField; 2] =
    [ProfileField::FullName, ProfileField::Email];

impl ProfileField {
    pub fn name(self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Title => "title",
            Self::Bio => "bio",
            Self::City => "city",
            Self::Country => "country",
            Self::DateMember => "date_member",
            Self::Email => "email",
        }
    }

    /// The value shown in place of this field when it is hidden.
    pub fn hidden_default(self) -> FieldDefault {
        match self {
            Self::DateMember => FieldDefault::NoDate,
            _ => FieldDefault::EmptyText,
        }
    }

    /// The privacy level the profile owner set for this field.
    pub fn privacy_of(self, profile: &Profile) -> PrivacyLevel {
        match self {
            Self::FullName => profile.privacy_full_name,
            Self::Title => profile.privacy_title,
            Self::Bio => profile.privacy_bio,
            Self::City => profile.privacy_city,
            Self::Country => profile.privacy_country,
            Self::DateMember => profile.privacy_date_member,
            Self::Email => profile.privacy_email,
        }
    }
}

/// Whether any privacy-controlled field of `profile` is visible at
/// `clearance`.  A profile failing this check shows nothing at all to the
/// viewer and is left out of vouch listings entirely.
pub fn any_field_visible_at(profile: &Profile, clearance: PrivacyLevel) -> bool {
    PRIVACY_FIELDS
        .iter()
        .any(|field| clearance >= field.privacy_of(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_has_a_name_and_default() {
        for field in PRIVACY_FIELDS {
            assert!(!field.name().is_empty());
            match field {
                ProfileField::DateMember => {
                    assert_eq!(field.hidden_default(), FieldDefault::NoDate)
                }
                _ => assert_eq!(field.hidden_default(), FieldDefault::EmptyText),
            }
        }
    }

    #[test]
    fn visibility_tracks_the_most_open_field() {
        let profile = annuaire_store::Profile::new_for_user(annuaire_shared::UserId::new());

        // Everything private: invisible below Private clearance.
        let all_private = {
            let mut p = profile.clone();
            p.privacy_full_name = PrivacyLevel::Private;
            p.privacy_title = PrivacyLevel::Private;
            p.privacy_bio = PrivacyLevel::Private;
            p.privacy_city = PrivacyLevel::Private;
            p.privacy_country = PrivacyLevel::Private;
            p.privacy_date_member = PrivacyLevel::Private;
            p.privacy_email = PrivacyLevel::Private;
            p
        };
        assert!(!any_field_visible_at(&all_private, PrivacyLevel::Public));
        assert!(any_field_visible_at(&all_private, PrivacyLevel::Private));

        // One public field makes the profile visible to anyone.
        let mut one_public = all_private;
        one_public.privacy_city = PrivacyLevel::Public;
        assert!(any_field_visible_at(&one_public, PrivacyLevel::Public));
    }
}
