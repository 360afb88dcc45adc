//! Profile CRUD and privacy-setting updates.

use chrono::Utc;
use rusqlite::{params, Connection};

use annuaire_shared::{DirectoryConfig, PrivacyLevel, ProfileId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Profile;
use crate::rows;

const PROFILE_COLUMNS: &str = "id, user_id, full_name, title, bio, city, country, date_member, \
     is_vouched, can_vouch, privacy_full_name, privacy_title, privacy_bio, privacy_city, \
     privacy_country, privacy_date_member, privacy_email, created_at, updated_at";

impl Database {
    pub fn get_profile(&self, id: ProfileId) -> Result<Profile> {
        self.conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1"),
                params![id.to_string()],
                row_to_profile,
            )
            .map_err(not_found)
    }

    pub fn get_profile_by_user(&self, user_id: UserId) -> Result<Profile> {
        self.conn()
            .query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id.to_string()],
                row_to_profile,
            )
            .map_err(not_found)
    }

    /// Persist the editable fields of a profile.
    ///
    /// The derived `is_vouched` / `can_vouch` flags are deliberately not
    /// written here; they only change through the vouch-flag recompute.
    pub fn update_profile(&self, profile: &Profile) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET
                full_name = ?1, title = ?2, bio = ?3, city = ?4, country = ?5,
                date_member = ?6, privacy_full_name = ?7, privacy_title = ?8,
                privacy_bio = ?9, privacy_city = ?10, privacy_country = ?11,
                privacy_date_member = ?12, privacy_email = ?13, updated_at = ?14
             WHERE id = ?15",
            params![
                profile.full_name,
                profile.title,
                profile.bio,
                profile.city,
                profile.country,
                profile.date_member.map(|d| d.format("%Y-%m-%d").to_string()),
                profile.privacy_full_name.code(),
                profile.privacy_title.code(),
                profile.privacy_bio.code(),
                profile.privacy_city.code(),
                profile.privacy_country.code(),
                profile.privacy_date_member.code(),
                profile.privacy_email.code(),
                Utc::now().to_rfc3339(),
                profile.id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Set every privacy-controlled field of the profile to `level`.
    pub fn set_all_privacy(&self, id: ProfileId, level: PrivacyLevel) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE profiles SET
                privacy_full_name = ?1, privacy_title = ?1, privacy_bio = ?1,
                privacy_city = ?1, privacy_country = ?1, privacy_date_member = ?1,
                privacy_email = ?1, updated_at = ?2
             WHERE id = ?3",
            params![level.code(), Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(profile = %id, level = %level, "privacy levels reset");
        Ok(())
    }

    /// Delete a profile.  The owning user row goes with it, which in turn
    /// cascades through identities, accounts and vouch edges.
    pub fn delete_profile(&mut self, id: ProfileId, config: &DirectoryConfig) -> Result<bool> {
        let profile = match self.get_profile(id) {
            Ok(p) => p,
            Err(StoreError::NotFound) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.delete_user(profile.user_id, config)
    }
}

/// Insert a profile row on an open connection (or transaction).
pub(crate) fn insert_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO profiles ({PROFILE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            profile.id.to_string(),
            profile.user_id.to_string(),
            profile.full_name,
            profile.title,
            profile.bio,
            profile.city,
            profile.country,
            profile.date_member.map(|d| d.format("%Y-%m-%d").to_string()),
            profile.is_vouched,
            profile.can_vouch,
            profile.privacy_full_name.code(),
            profile.privacy_title.code(),
            profile.privacy_bio.code(),
            profile.privacy_city.code(),
            profile.privacy_country.code(),
            profile.privacy_date_member.code(),
            profile.privacy_email.code(),
            profile.created_at.to_rfc3339(),
            profile.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

pub(crate) fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let date_member_str: Option<String> = row.get(7)?;
    let created_str: String = row.get(17)?;
    let updated_str: String = row.get(18)?;

    Ok(Profile {
        id: ProfileId(rows::parse_uuid(0, &id_str)?),
        user_id: UserId(rows::parse_uuid(1, &user_id_str)?),
        full_name: row.get(2)?,
        title: row.get(3)?,
        bio: row.get(4)?,
        city: row.get(5)?,
        country: row.get(6)?,
        date_member: date_member_str
            .map(|s| rows::parse_date(7, &s))
            .transpose()?,
        is_vouched: row.get(8)?,
        can_vouch: row.get(9)?,
        privacy_full_name: rows::parse_level(10, row.get(10)?)?,
        privacy_title: rows::parse_level(11, row.get(11)?)?,
        privacy_bio: rows::parse_level(12, row.get(12)?)?,
        privacy_city: rows::parse_level(13, row.get(13)?)?,
        privacy_country: rows::parse_level(14, row.get(14)?)?,
        privacy_date_member: rows::parse_level(15, row.get(15)?)?,
        privacy_email: rows::parse_level(16, row.get(16)?)?,
        created_at: rows::parse_ts(17, &created_str)?,
        updated_at: rows::parse_ts(18, &updated_str)?,
    })
}
