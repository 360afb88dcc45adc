//! External accounts a member lists on their profile (alternate emails,
//! websites, service accounts), each with its own privacy level.

use rusqlite::params;
use uuid::Uuid;

use annuaire_shared::{PrivacyLevel, ProfileId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{AccountKind, ExternalAccount};
use crate::rows;

impl Database {
    /// Add an external account to a profile.
    ///
    /// Rejected with [`StoreError::DuplicateIdentityClaim`] when the profile
    /// already lists the same identifier under the same kind.
    pub fn add_external_account(
        &self,
        profile_id: ProfileId,
        kind: AccountKind,
        identifier: &str,
        privacy: PrivacyLevel,
    ) -> Result<ExternalAccount> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM external_accounts
             WHERE profile_id = ?1 AND kind = ?2 AND identifier = ?3)",
            params![profile_id.to_string(), kind.as_str(), identifier],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicateIdentityClaim);
        }

        let account = ExternalAccount {
            id: Uuid::new_v4(),
            profile_id,
            kind,
            identifier: identifier.to_string(),
            privacy,
        };
        self.conn().execute(
            "INSERT INTO external_accounts (id, profile_id, kind, identifier, privacy)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                account.id.to_string(),
                account.profile_id.to_string(),
                account.kind.as_str(),
                account.identifier,
                account.privacy.code(),
            ],
        )?;
        Ok(account)
    }

    pub fn remove_external_account(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM external_accounts WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// All external accounts of a profile, grouped by kind.
    pub fn external_accounts_for_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Vec<ExternalAccount>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, profile_id, kind, identifier, privacy
             FROM external_accounts WHERE profile_id = ?1 ORDER BY kind, identifier",
        )?;
        let rows = stmt.query_map(params![profile_id.to_string()], row_to_account)?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row?);
        }
        Ok(accounts)
    }
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExternalAccount> {
    let id_str: String = row.get(0)?;
    let profile_str: String = row.get(1)?;
    let kind_str: String = row.get(2)?;

    let kind = AccountKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown account kind: {kind_str}").into(),
        )
    })?;

    Ok(ExternalAccount {
        id: rows::parse_uuid(0, &id_str)?,
        profile_id: ProfileId(rows::parse_uuid(1, &profile_str)?),
        kind,
        identifier: row.get(3)?,
        privacy: rows::parse_level(4, row.get(4)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn add_list_remove() {
        let mut db = test_db();
        let (_, profile) = db.create_user("jdoe", "jdoe@example.com").unwrap();

        let email = db
            .add_external_account(
                profile.id,
                AccountKind::Email,
                "alt@example.com",
                PrivacyLevel::Members,
            )
            .unwrap();
        db.add_external_account(
            profile.id,
            AccountKind::Website,
            "https://example.com",
            PrivacyLevel::Public,
        )
        .unwrap();

        let accounts = db.external_accounts_for_profile(profile.id).unwrap();
        assert_eq!(accounts.len(), 2);

        assert!(db.remove_external_account(email.id).unwrap());
        assert!(!db.remove_external_account(email.id).unwrap());
    }

    #[test]
    fn duplicate_account_rejected() {
        let mut db = test_db();
        let (_, profile) = db.create_user("jdoe", "jdoe@example.com").unwrap();

        db.add_external_account(
            profile.id,
            AccountKind::Email,
            "alt@example.com",
            PrivacyLevel::Members,
        )
        .unwrap();
        assert!(matches!(
            db.add_external_account(
                profile.id,
                AccountKind::Email,
                "alt@example.com",
                PrivacyLevel::Public,
            ),
            Err(StoreError::DuplicateIdentityClaim)
        ));
    }
}
