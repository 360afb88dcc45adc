//! Identity-link management and its primary/contact state machine.
//!
//! Rules, all enforced inside one transaction per mutation:
//! - the first link of a profile becomes the primary contact identity;
//! - a newly linked high-assurance provider stronger than every existing
//!   link becomes the primary (login) identity, demoting all siblings and
//!   updating the owning user's email;
//! - the contact identity's privacy level is mirrored onto the profile's
//!   `privacy_email`;
//! - the sole contact identity can never be deleted, only reassigned first.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use annuaire_shared::{IdentityId, PrivacyLevel, ProfileId, ProviderType, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::IdentityLink;
use crate::rows;

const IDENTITY_COLUMNS: &str = "id, profile_id, provider, subject, email, username, \
     is_primary, is_primary_contact, privacy, created_at, updated_at";

impl Database {
    /// Attach an IdP identity to a profile.
    ///
    /// The provider is derived from the subject id prefix.  Rejected with
    /// [`StoreError::DuplicateIdentityClaim`] when the subject is already
    /// claimed by another profile or when this profile already holds an
    /// identity with the same provider and email.
    pub fn link_identity(
        &mut self,
        profile_id: ProfileId,
        subject: &str,
        email: &str,
        username: &str,
        privacy: PrivacyLevel,
    ) -> Result<IdentityLink> {
        let provider = ProviderType::from_subject(subject);
        let tx = self.conn_mut().transaction()?;

        let user_id: String = tx
            .query_row(
                "SELECT user_id FROM profiles WHERE id = ?1",
                params![profile_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        let user_id = UserId(rows::parse_uuid(0, &user_id)?);

        // The subject may belong to at most one profile, globally.
        let claimed_elsewhere: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM identities WHERE subject = ?1 AND profile_id != ?2)",
            params![subject, profile_id.to_string()],
            |row| row.get(0),
        )?;
        if claimed_elsewhere {
            return Err(StoreError::DuplicateIdentityClaim);
        }

        // No duplicate (profile, provider, email) claims.
        let duplicate: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM identities
             WHERE profile_id = ?1 AND provider = ?2 AND email = ?3)",
            params![profile_id.to_string(), provider.code(), email],
            |row| row.get(0),
        )?;
        if duplicate {
            return Err(StoreError::DuplicateIdentityClaim);
        }

        // First link for the profile becomes the contact identity.
        let has_contact: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM identities
             WHERE profile_id = ?1 AND is_primary_contact = 1)",
            params![profile_id.to_string()],
            |row| row.get(0),
        )?;
        let is_primary_contact = !has_contact;

        // A stronger high-assurance provider takes over as login identity.
        let strongest: Option<i64> = tx.query_row(
            "SELECT MAX(provider) FROM identities WHERE profile_id = ?1",
            params![profile_id.to_string()],
            |row| row.get(0),
        )?;
        let is_primary = provider.is_high_assurance()
            && strongest
                .map(|code| i64::from(provider.code()) > code)
                .unwrap_or(true);

        if is_primary {
            tx.execute(
                "UPDATE identities SET is_primary = 0, updated_at = ?1 WHERE profile_id = ?2",
                params![Utc::now().to_rfc3339(), profile_id.to_string()],
            )?;
            tx.execute(
                "UPDATE users SET email = ?1 WHERE id = ?2",
                params![email, user_id.to_string()],
            )?;
        }

        if is_primary_contact {
            tx.execute(
                "UPDATE profiles SET privacy_email = ?1 WHERE id = ?2",
                params![privacy.code(), profile_id.to_string()],
            )?;
        }

        let now = Utc::now();
        let link = IdentityLink {
            id: IdentityId::new(),
            profile_id,
            provider,
            subject: subject.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            is_primary,
            is_primary_contact,
            privacy,
            created_at: now,
            updated_at: now,
        };
        tx.execute(
            &format!(
                "INSERT INTO identities ({IDENTITY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                link.id.to_string(),
                link.profile_id.to_string(),
                link.provider.code(),
                link.subject,
                link.email,
                link.username,
                link.is_primary,
                link.is_primary_contact,
                link.privacy.code(),
                link.created_at.to_rfc3339(),
                link.updated_at.to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            profile = %profile_id,
            provider = ?provider,
            primary = link.is_primary,
            contact = link.is_primary_contact,
            "identity linked"
        );
        Ok(link)
    }

    /// Make `id` the primary contact identity of its profile.
    ///
    /// Demotes all sibling links and mirrors the new contact's privacy level
    /// onto the profile's `privacy_email`, atomically.
    pub fn set_primary_contact(&mut self, id: IdentityId) -> Result<IdentityLink> {
        let tx = self.conn_mut().transaction()?;
        let link = get_identity_on(&tx, id)?;

        tx.execute(
            "UPDATE identities SET is_primary_contact = 0, updated_at = ?1
             WHERE profile_id = ?2",
            params![Utc::now().to_rfc3339(), link.profile_id.to_string()],
        )?;
        tx.execute(
            "UPDATE identities SET is_primary_contact = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        tx.execute(
            "UPDATE profiles SET privacy_email = ?1 WHERE id = ?2",
            params![link.privacy.code(), link.profile_id.to_string()],
        )?;

        let updated = get_identity_on(&tx, id)?;
        tx.commit()?;

        tracing::info!(identity = %id, profile = %updated.profile_id, "primary contact reassigned");
        Ok(updated)
    }

    /// Delete an identity link.
    ///
    /// Deleting the contact identity is rejected with
    /// [`StoreError::LastContactIdentity`]; callers must reassign the contact
    /// via [`Database::set_primary_contact`] first.
    pub fn delete_identity(&mut self, id: IdentityId) -> Result<()> {
        let tx = self.conn_mut().transaction()?;
        let link = get_identity_on(&tx, id)?;

        if link.is_primary_contact {
            return Err(StoreError::LastContactIdentity);
        }

        tx.execute(
            "DELETE FROM identities WHERE id = ?1",
            params![id.to_string()],
        )?;
        tx.commit()?;

        tracing::info!(identity = %id, profile = %link.profile_id, "identity deleted");
        Ok(())
    }

    pub fn get_identity(&self, id: IdentityId) -> Result<IdentityLink> {
        get_identity_on(self.conn(), id)
    }

    /// All identity links of a profile, oldest first.
    pub fn identities_for_profile(&self, profile_id: ProfileId) -> Result<Vec<IdentityLink>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities
             WHERE profile_id = ?1 ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![profile_id.to_string()], row_to_identity)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    /// The contact identity of a profile, if it has any links at all.
    pub fn primary_contact_identity(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<IdentityLink>> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {IDENTITY_COLUMNS} FROM identities
                     WHERE profile_id = ?1 AND is_primary_contact = 1"
                ),
                params![profile_id.to_string()],
                row_to_identity,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }
}

fn get_identity_on(conn: &Connection, id: IdentityId) -> Result<IdentityLink> {
    conn.query_row(
        &format!("SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = ?1"),
        params![id.to_string()],
        row_to_identity,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    })
}

fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<IdentityLink> {
    let id_str: String = row.get(0)?;
    let profile_str: String = row.get(1)?;
    let created_str: String = row.get(9)?;
    let updated_str: String = row.get(10)?;

    Ok(IdentityLink {
        id: IdentityId(rows::parse_uuid(0, &id_str)?),
        profile_id: ProfileId(rows::parse_uuid(1, &profile_str)?),
        provider: rows::parse_provider(2, row.get(2)?)?,
        subject: row.get(3)?,
        email: row.get(4)?,
        username: row.get(5)?,
        is_primary: row.get(6)?,
        is_primary_contact: row.get(7)?,
        privacy: rows::parse_level(8, row.get(8)?)?,
        created_at: rows::parse_ts(9, &created_str)?,
        updated_at: rows::parse_ts(10, &updated_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_profile(db: &mut Database, username: &str) -> ProfileId {
        let (_, profile) = db
            .create_user(username, &format!("{username}@example.com"))
            .unwrap();
        profile.id
    }

    #[test]
    fn first_link_becomes_contact() {
        let mut db = test_db();
        let profile = make_profile(&mut db, "jdoe");

        let link = db
            .link_identity(
                profile,
                "email|abc",
                "jdoe@example.com",
                "jdoe",
                PrivacyLevel::Members,
            )
            .unwrap();

        assert_eq!(link.provider, ProviderType::Passwordless);
        assert!(link.is_primary_contact);
        // Passwordless is not high assurance, so no login promotion.
        assert!(!link.is_primary);
    }

    #[test]
    fn high_assurance_link_promotes_and_demotes() {
        let mut db = test_db();
        let profile = make_profile(&mut db, "jdoe");
        let user = db.get_profile(profile).unwrap().user_id;

        let first = db
            .link_identity(
                profile,
                "email|abc",
                "jdoe@example.com",
                "jdoe",
                PrivacyLevel::Members,
            )
            .unwrap();

        let github = db
            .link_identity(
                profile,
                "github|1234567",
                "jdoe@users.noreply.github.com",
                "jdoe",
                PrivacyLevel::Members,
            )
            .unwrap();

        assert!(github.is_primary);
        // The first link keeps the contact role; only the login flag moves.
        assert!(!github.is_primary_contact);
        let first = db.get_identity(first.id).unwrap();
        assert!(!first.is_primary);
        assert!(first.is_primary_contact);

        // The account's visible email follows the new login identity.
        let user = db.get_user(user).unwrap();
        assert_eq!(user.email, "jdoe@users.noreply.github.com");
    }

    #[test]
    fn weaker_provider_does_not_take_over() {
        let mut db = test_db();
        let profile = make_profile(&mut db, "jdoe");

        let ldap = db
            .link_identity(
                profile,
                "ad|corp-LDAP|jdoe",
                "jdoe@corp.example",
                "jdoe",
                PrivacyLevel::Members,
            )
            .unwrap();
        let github = db
            .link_identity(
                profile,
                "github|1234567",
                "jdoe@users.noreply.github.com",
                "jdoe",
                PrivacyLevel::Members,
            )
            .unwrap();

        assert!(ldap.is_primary);
        assert!(!github.is_primary);
        assert!(db.get_identity(ldap.id).unwrap().is_primary);
    }

    #[test]
    fn duplicate_claims_rejected() {
        let mut db = test_db();
        let alice = make_profile(&mut db, "alice");
        let bob = make_profile(&mut db, "bob");

        db.link_identity(alice, "github|42", "a@example.com", "alice", PrivacyLevel::Members)
            .unwrap();

        // Same subject on another profile.
        assert!(matches!(
            db.link_identity(bob, "github|42", "b@example.com", "bob", PrivacyLevel::Members),
            Err(StoreError::DuplicateIdentityClaim)
        ));

        // Same (profile, provider, email) again.
        assert!(matches!(
            db.link_identity(
                alice,
                "github|42",
                "a@example.com",
                "alice",
                PrivacyLevel::Members
            ),
            Err(StoreError::DuplicateIdentityClaim)
        ));
    }

    #[test]
    fn sole_contact_identity_cannot_be_deleted() {
        let mut db = test_db();
        let profile = make_profile(&mut db, "jdoe");

        let contact = db
            .link_identity(profile, "email|abc", "a@example.com", "jdoe", PrivacyLevel::Members)
            .unwrap();

        assert!(matches!(
            db.delete_identity(contact.id),
            Err(StoreError::LastContactIdentity)
        ));
        assert!(db.get_identity(contact.id).is_ok());
    }

    #[test]
    fn contact_reassignment_allows_deletion() {
        let mut db = test_db();
        let profile = make_profile(&mut db, "jdoe");

        let old = db
            .link_identity(profile, "email|abc", "a@example.com", "jdoe", PrivacyLevel::Members)
            .unwrap();
        let new = db
            .link_identity(
                profile,
                "github|42",
                "b@example.com",
                "jdoe",
                PrivacyLevel::Public,
            )
            .unwrap();

        db.set_primary_contact(new.id).unwrap();

        // Exactly one contact at any time.
        let contacts: Vec<_> = db
            .identities_for_profile(profile)
            .unwrap()
            .into_iter()
            .filter(|l| l.is_primary_contact)
            .collect();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, new.id);

        // The contact's privacy now gates the profile email.
        let fetched = db.get_profile(profile).unwrap();
        assert_eq!(fetched.privacy_email, PrivacyLevel::Public);

        db.delete_identity(old.id).unwrap();
        assert!(matches!(db.get_identity(old.id), Err(StoreError::NotFound)));
    }
}
