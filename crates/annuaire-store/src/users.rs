//! Auth account CRUD.
//!
//! A profile is created together with its user row in one transaction; the
//! original system did this with a post-save signal, here the write path is
//! explicit so a user can never exist without a profile.

use chrono::Utc;
use rusqlite::params;

use annuaire_shared::{DirectoryConfig, ProfileId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Profile, User};
use crate::rows;
use crate::vouches;

impl Database {
    /// Create a user together with its empty profile.
    pub fn create_user(&mut self, username: &str, email: &str) -> Result<(User, Profile)> {
        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            email: email.to_string(),
            is_superuser: false,
            is_staff: false,
            created_at: Utc::now(),
        };
        let profile = Profile::new_for_user(user.id);

        let tx = self.conn_mut().transaction()?;
        tx.execute(
            "INSERT INTO users (id, username, email, is_superuser, is_staff, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.is_superuser,
                user.is_staff,
                user.created_at.to_rfc3339(),
            ],
        )?;
        crate::profiles::insert_profile(&tx, &profile)?;
        tx.commit()?;

        tracing::info!(user = %user.id, profile = %profile.id, "user created");

        Ok((user, profile))
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, email, is_superuser, is_staff, created_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, username, email, is_superuser, is_staff, created_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Flip the superuser flag.
    pub fn set_superuser(&self, id: UserId, is_superuser: bool) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET is_superuser = ?1 WHERE id = ?2",
            params![is_superuser, id.to_string()],
        )?;
        Ok(())
    }

    /// Flip the staff flag.
    pub fn set_staff(&self, id: UserId, is_staff: bool) -> Result<()> {
        self.conn().execute(
            "UPDATE users SET is_staff = ?1 WHERE id = ?2",
            params![is_staff, id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a user, its profile and all dependent rows.
    ///
    /// Vouches this user's profile had received disappear with it; vouches it
    /// had made survive with a NULL voucher.  Flags of the affected vouchees
    /// are recomputed inside the same transaction.
    pub fn delete_user(&mut self, id: UserId, config: &DirectoryConfig) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;

        let vouchees: Vec<ProfileId> = {
            let mut stmt = tx.prepare(
                "SELECT v.vouchee_id FROM vouches v
                 JOIN profiles p ON p.id = v.voucher_id
                 WHERE p.user_id = ?1",
            )?;
            let rows = stmt.query_map(params![id.to_string()], |row| {
                let s: String = row.get(0)?;
                rows::parse_uuid(0, &s).map(ProfileId)
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let affected = tx.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;

        for vouchee in vouchees {
            vouches::recompute_flags_on(&tx, vouchee, config)?;
        }

        tx.commit()?;

        if affected > 0 {
            tracing::info!(user = %id, "user deleted");
        }
        Ok(affected > 0)
    }
}

fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let ts_str: String = row.get(5)?;

    Ok(User {
        id: UserId(rows::parse_uuid(0, &id_str)?),
        username: row.get(1)?,
        email: row.get(2)?,
        is_superuser: row.get(3)?,
        is_staff: row.get(4)?,
        created_at: rows::parse_ts(5, &ts_str)?,
    })
}
