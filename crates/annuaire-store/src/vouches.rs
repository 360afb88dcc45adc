//! The vouch graph: eligibility checks, vouch creation/removal and the
//! derived trust flags.
//!
//! `is_vouched` and `can_vouch` are recomputed from the received-vouch count
//! inside the same transaction as every vouch insert or delete, so a reader
//! can never observe a vouched profile with zero backing edges or the
//! reverse.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use annuaire_shared::{constants, DirectoryConfig, ProfileId, VouchId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Vouch;
use crate::rows;

impl Database {
    /// Whether `vouchee` may receive a vouch from `voucher`.
    ///
    /// Mirrors the checks done by [`Database::vouch`]; use that method for
    /// the actual write, it reports the failing rule as a typed error.
    pub fn is_vouchable(
        &self,
        vouchee: ProfileId,
        voucher: Option<ProfileId>,
        config: &DirectoryConfig,
    ) -> Result<bool> {
        match check_vouchable_on(self.conn(), vouchee, voucher, config) {
            Ok(()) => Ok(true),
            Err(
                StoreError::NotVouchable
                | StoreError::DuplicateVouch
                | StoreError::VouchLimitExceeded { .. },
            ) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Record a vouch for `vouchee` and recompute its trust flags, as one
    /// transaction.
    ///
    /// Eligibility is checked before any write; a failed rule surfaces as
    /// [`StoreError::NotVouchable`], [`StoreError::DuplicateVouch`] or
    /// [`StoreError::VouchLimitExceeded`] and leaves the graph untouched.
    pub fn vouch(
        &mut self,
        vouchee: ProfileId,
        voucher: Option<ProfileId>,
        description: &str,
        config: &DirectoryConfig,
    ) -> Result<Vouch> {
        let tx = self.conn_mut().transaction()?;
        let vouch = insert_vouch(&tx, vouchee, voucher, description, false, config)?;
        tx.commit()?;

        tracing::info!(
            vouchee = %vouchee,
            voucher = ?voucher.map(|v| v.to_string()),
            "vouch recorded"
        );
        Ok(vouch)
    }

    /// Remove a vouch and recompute the vouchee's flags, as one transaction.
    ///
    /// Returns `false` when no such vouch exists.
    pub fn unvouch(&mut self, id: VouchId, config: &DirectoryConfig) -> Result<bool> {
        let tx = self.conn_mut().transaction()?;

        let vouchee: Option<String> = tx
            .query_row(
                "SELECT vouchee_id FROM vouches WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        let Some(vouchee) = vouchee else {
            return Ok(false);
        };
        let vouchee = ProfileId(rows::parse_uuid(0, &vouchee)?);

        tx.execute("DELETE FROM vouches WHERE id = ?1", params![id.to_string()])?;
        recompute_flags_on(&tx, vouchee, config)?;
        tx.commit()?;

        tracing::info!(vouch = %id, vouchee = %vouchee, "vouch removed");
        Ok(true)
    }

    /// Create an automatic vouch (no voucher, fixed system reason).
    ///
    /// Idempotent: if the profile already carries an autovouch the call is a
    /// no-op returning `None`, so the IdP callback may fire it on every
    /// login.
    pub fn auto_vouch(
        &mut self,
        profile: ProfileId,
        config: &DirectoryConfig,
    ) -> Result<Option<Vouch>> {
        let tx = self.conn_mut().transaction()?;

        let already: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM vouches WHERE vouchee_id = ?1 AND autovouch = 1)",
            params![profile.to_string()],
            |row| row.get(0),
        )?;
        if already {
            return Ok(None);
        }

        let vouch = insert_vouch(&tx, profile, None, &config.auto_vouch_reason, true, config)?;
        tx.commit()?;

        tracing::info!(vouchee = %profile, "autovouch recorded");
        Ok(Some(vouch))
    }

    /// Auto-vouch a profile when its verified email belongs to one of the
    /// staff domains.  Consumed by the identity-provider callback.
    pub fn auto_vouch_if_staff_domain(
        &mut self,
        profile: ProfileId,
        email: &str,
        config: &DirectoryConfig,
    ) -> Result<Option<Vouch>> {
        if !config.is_auto_vouch_email(email) {
            return Ok(None);
        }
        self.auto_vouch(profile, config)
    }

    /// Recount received vouches and persist the derived flags.
    ///
    /// Idempotent; has no side effect beyond the two flag columns.
    pub fn recompute_vouch_flags(
        &mut self,
        vouchee: ProfileId,
        config: &DirectoryConfig,
    ) -> Result<(bool, bool)> {
        let tx = self.conn_mut().transaction()?;
        let flags = recompute_flags_on(&tx, vouchee, config)?;
        tx.commit()?;
        Ok(flags)
    }

    /// Vouches received by a profile, most recent first.
    pub fn vouches_received(&self, vouchee: ProfileId) -> Result<Vec<Vouch>> {
        self.list_vouches(
            "SELECT id, vouchee_id, voucher_id, description, autovouch, date
             FROM vouches WHERE vouchee_id = ?1 ORDER BY date DESC",
            vouchee,
        )
    }

    /// Vouches made by a profile, most recent first.
    pub fn vouches_made(&self, voucher: ProfileId) -> Result<Vec<Vouch>> {
        self.list_vouches(
            "SELECT id, vouchee_id, voucher_id, description, autovouch, date
             FROM vouches WHERE voucher_id = ?1 ORDER BY date DESC",
            voucher,
        )
    }

    pub fn received_vouch_count(&self, vouchee: ProfileId) -> Result<u32> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM vouches WHERE vouchee_id = ?1",
            params![vouchee.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    /// Date of the earliest received vouch, if any.
    pub fn date_vouched(&self, vouchee: ProfileId) -> Result<Option<DateTime<Utc>>> {
        let date: Option<String> = self.conn().query_row(
            "SELECT MIN(date) FROM vouches WHERE vouchee_id = ?1",
            params![vouchee.to_string()],
            |row| row.get(0),
        )?;
        date.map(|s| rows::parse_ts(0, &s).map_err(StoreError::Sqlite))
            .transpose()
    }

    fn list_vouches(&self, sql: &str, profile: ProfileId) -> Result<Vec<Vouch>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params![profile.to_string()], row_to_vouch)?;

        let mut vouches = Vec::new();
        for row in rows {
            vouches.push(row?);
        }
        Ok(vouches)
    }
}

/// Eligibility rules, evaluated before any write.
fn check_vouchable_on(
    conn: &Connection,
    vouchee: ProfileId,
    voucher: Option<ProfileId>,
    config: &DirectoryConfig,
) -> Result<()> {
    // A voucher, if present, must itself be allowed to vouch.
    if let Some(voucher) = voucher {
        let can_vouch: bool = conn
            .query_row(
                "SELECT can_vouch FROM profiles WHERE id = ?1",
                params![voucher.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        if !can_vouch {
            return Err(StoreError::NotVouchable);
        }
    }

    // Hard cap on received vouches, no matter who vouches.
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM vouches WHERE vouchee_id = ?1",
        params![vouchee.to_string()],
        |row| row.get(0),
    )?;
    if count as u32 >= config.vouch_count_limit {
        return Err(StoreError::VouchLimitExceeded {
            limit: config.vouch_count_limit,
        });
    }

    // One vouch per (vouchee, voucher) pair.
    if let Some(voucher) = voucher {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM vouches WHERE vouchee_id = ?1 AND voucher_id = ?2)",
            params![vouchee.to_string(), voucher.to_string()],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::DuplicateVouch);
        }
    }

    Ok(())
}

fn insert_vouch(
    conn: &Connection,
    vouchee: ProfileId,
    voucher: Option<ProfileId>,
    description: &str,
    autovouch: bool,
    config: &DirectoryConfig,
) -> Result<Vouch> {
    check_vouchable_on(conn, vouchee, voucher, config)?;

    // Descriptions are capped; anything longer is cut at the limit.
    let description: String = description
        .chars()
        .take(constants::VOUCH_DESCRIPTION_MAX_LEN)
        .collect();

    let vouch = Vouch {
        id: VouchId::new(),
        vouchee_id: vouchee,
        voucher_id: voucher,
        description,
        autovouch,
        date: Utc::now(),
    };
    conn.execute(
        "INSERT INTO vouches (id, vouchee_id, voucher_id, description, autovouch, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            vouch.id.to_string(),
            vouch.vouchee_id.to_string(),
            vouch.voucher_id.map(|v| v.to_string()),
            vouch.description,
            vouch.autovouch,
            vouch.date.to_rfc3339(),
        ],
    )?;

    recompute_flags_on(conn, vouchee, config)?;
    Ok(vouch)
}

/// Recount received vouches for `vouchee` and persist the derived flags on
/// the given connection (usually an open transaction).
pub(crate) fn recompute_flags_on(
    conn: &Connection,
    vouchee: ProfileId,
    config: &DirectoryConfig,
) -> Result<(bool, bool)> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM vouches WHERE vouchee_id = ?1",
        params![vouchee.to_string()],
        |row| row.get(0),
    )?;
    let count = count as u32;

    let is_vouched = count > 0;
    let can_vouch = count >= config.can_vouch_threshold;

    conn.execute(
        "UPDATE profiles SET is_vouched = ?1, can_vouch = ?2 WHERE id = ?3",
        params![is_vouched, can_vouch, vouchee.to_string()],
    )?;

    tracing::debug!(
        vouchee = %vouchee,
        count,
        is_vouched,
        can_vouch,
        "vouch flags recomputed"
    );
    Ok((is_vouched, can_vouch))
}

fn row_to_vouch(row: &rusqlite::Row<'_>) -> rusqlite::Result<Vouch> {
    let id_str: String = row.get(0)?;
    let vouchee_str: String = row.get(1)?;
    let voucher_str: Option<String> = row.get(2)?;
    let date_str: String = row.get(5)?;

    Ok(Vouch {
        id: VouchId(rows::parse_uuid(0, &id_str)?),
        vouchee_id: ProfileId(rows::parse_uuid(1, &vouchee_str)?),
        voucher_id: voucher_str
            .map(|s| rows::parse_uuid(2, &s).map(ProfileId))
            .transpose()?,
        description: row.get(3)?,
        autovouch: row.get(4)?,
        date: rows::parse_ts(5, &date_str)?,
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

    /// Give a profile enough vouches to cross the can-vouch threshold.
    fn make_voucher(db: &mut Database, username: &str, config: &DirectoryConfig) -> ProfileId {
        let id = make_profile(db, username);
        for _ in 0..config.can_vouch_threshold {
            db.auto_vouch(id, config).unwrap();
            // Clear the autovouch guard so we can stack several.
            db.conn()
                .execute(
                    "UPDATE vouches SET autovouch = 0 WHERE vouchee_id = ?1",
                    params![id.to_string()],
                )
                .unwrap();
        }
        id
    }

    #[test]
    fn flag_progression() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");

        let profile = db.get_profile(vouchee).unwrap();
        assert!(!profile.is_vouched);
        assert!(!profile.can_vouch);

        let a = make_voucher(&mut db, "a", &config);
        db.vouch(vouchee, Some(a), "met at an event", &config).unwrap();
        let profile = db.get_profile(vouchee).unwrap();
        assert!(profile.is_vouched);
        assert!(!profile.can_vouch);

        let b = make_voucher(&mut db, "b", &config);
        let c = make_voucher(&mut db, "c", &config);
        db.vouch(vouchee, Some(b), "project work", &config).unwrap();
        db.vouch(vouchee, Some(c), "long-time contributor", &config)
            .unwrap();

        let profile = db.get_profile(vouchee).unwrap();
        assert!(profile.is_vouched);
        assert!(profile.can_vouch);
    }

    #[test]
    fn voucher_without_can_vouch_is_rejected() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");
        let voucher = make_profile(&mut db, "also-new");

        assert!(!db.is_vouchable(vouchee, Some(voucher), &config).unwrap());
        assert!(matches!(
            db.vouch(vouchee, Some(voucher), "nope", &config),
            Err(StoreError::NotVouchable)
        ));
        assert_eq!(db.received_vouch_count(vouchee).unwrap(), 0);
    }

    #[test]
    fn duplicate_vouch_rejected() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");
        let voucher = make_voucher(&mut db, "senior", &config);

        db.vouch(vouchee, Some(voucher), "first", &config).unwrap();
        assert!(matches!(
            db.vouch(vouchee, Some(voucher), "again", &config),
            Err(StoreError::DuplicateVouch)
        ));
        assert_eq!(db.received_vouch_count(vouchee).unwrap(), 1);
    }

    #[test]
    fn vouch_limit_enforced() {
        let mut db = test_db();
        let config = DirectoryConfig {
            vouch_count_limit: 2,
            ..DirectoryConfig::default()
        };
        let vouchee = make_profile(&mut db, "popular");
        // Build the vouchers under the default limits; only the vouchee is
        // subject to the tightened cap.
        let defaults = DirectoryConfig::default();
        let a = make_voucher(&mut db, "a", &defaults);
        let b = make_voucher(&mut db, "b", &defaults);
        let c = make_voucher(&mut db, "c", &defaults);

        db.vouch(vouchee, Some(a), "one", &config).unwrap();
        db.vouch(vouchee, Some(b), "two", &config).unwrap();

        let before = db.get_profile(vouchee).unwrap();
        let err = db.vouch(vouchee, Some(c), "three", &config).unwrap_err();
        assert!(matches!(err, StoreError::VouchLimitExceeded { limit: 2 }));

        // No row inserted, flags unchanged.
        assert_eq!(db.received_vouch_count(vouchee).unwrap(), 2);
        let after = db.get_profile(vouchee).unwrap();
        assert_eq!(before.is_vouched, after.is_vouched);
        assert_eq!(before.can_vouch, after.can_vouch);
    }

    #[test]
    fn unvouch_recomputes_flags() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");
        let voucher = make_voucher(&mut db, "senior", &config);

        let vouch = db.vouch(vouchee, Some(voucher), "hello", &config).unwrap();
        assert!(db.get_profile(vouchee).unwrap().is_vouched);

        assert!(db.unvouch(vouch.id, &config).unwrap());
        assert!(!db.get_profile(vouchee).unwrap().is_vouched);
        assert!(!db.unvouch(vouch.id, &config).unwrap());
    }

    #[test]
    fn recompute_is_idempotent() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");
        db.auto_vouch(vouchee, &config).unwrap();

        let first = db.recompute_vouch_flags(vouchee, &config).unwrap();
        let second = db.recompute_vouch_flags(vouchee, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, (true, false));
    }

    #[test]
    fn auto_vouch_is_idempotent() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let profile = make_profile(&mut db, "staffer");

        assert!(db.auto_vouch(profile, &config).unwrap().is_some());
        assert!(db.auto_vouch(profile, &config).unwrap().is_none());
        assert_eq!(db.received_vouch_count(profile).unwrap(), 1);

        let vouches = db.vouches_received(profile).unwrap();
        assert!(vouches[0].autovouch);
        assert!(vouches[0].voucher_id.is_none());
    }

    #[test]
    fn staff_domain_auto_vouch() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let profile = make_profile(&mut db, "staffer");

        assert!(db
            .auto_vouch_if_staff_domain(profile, "who@example.com", &config)
            .unwrap()
            .is_none());
        assert!(db
            .auto_vouch_if_staff_domain(profile, "who@mozilla.com", &config)
            .unwrap()
            .is_some());
    }

    #[test]
    fn long_description_is_capped() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");
        let voucher = make_voucher(&mut db, "senior", &config);

        let long = "x".repeat(constants::VOUCH_DESCRIPTION_MAX_LEN + 100);
        let vouch = db.vouch(vouchee, Some(voucher), &long, &config).unwrap();
        assert_eq!(
            vouch.description.len(),
            constants::VOUCH_DESCRIPTION_MAX_LEN
        );
    }

    #[test]
    fn voucher_deletion_keeps_the_vouch() {
        let mut db = test_db();
        let config = DirectoryConfig::default();
        let vouchee = make_profile(&mut db, "newbie");
        let voucher = make_voucher(&mut db, "senior", &config);

        db.vouch(vouchee, Some(voucher), "hello", &config).unwrap();
        db.delete_profile(voucher, &config).unwrap();

        let vouches = db.vouches_received(vouchee).unwrap();
        assert_eq!(vouches.len(), 1);
        assert!(vouches[0].voucher_id.is_none());
        assert!(db.get_profile(vouchee).unwrap().is_vouched);
    }
}
