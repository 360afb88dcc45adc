//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `users`, `profiles`, `identities`,
//! `external_accounts`, and `vouches`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (auth accounts, 1:1 with profiles)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    username     TEXT NOT NULL UNIQUE,
    email        TEXT NOT NULL DEFAULT '',
    is_superuser INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    is_staff     INTEGER NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Profiles
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    id                  TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id             TEXT NOT NULL UNIQUE,       -- FK -> users(id)
    full_name           TEXT NOT NULL DEFAULT '',
    title               TEXT NOT NULL DEFAULT '',
    bio                 TEXT NOT NULL DEFAULT '',
    city                TEXT NOT NULL DEFAULT '',
    country             TEXT NOT NULL DEFAULT '',
    date_member         TEXT,                       -- nullable ISO date
    is_vouched          INTEGER NOT NULL DEFAULT 0,
    can_vouch           INTEGER NOT NULL DEFAULT 0,
    privacy_full_name   INTEGER NOT NULL DEFAULT 20,
    privacy_title       INTEGER NOT NULL DEFAULT 20,
    privacy_bio         INTEGER NOT NULL DEFAULT 20,
    privacy_city        INTEGER NOT NULL DEFAULT 20,
    privacy_country     INTEGER NOT NULL DEFAULT 20,
    privacy_date_member INTEGER NOT NULL DEFAULT 20,
    privacy_email       INTEGER NOT NULL DEFAULT 20,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Identity links (IdP identities attached to a profile)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS identities (
    id                 TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    profile_id         TEXT NOT NULL,               -- FK -> profiles(id)
    provider           INTEGER NOT NULL DEFAULT 0,
    subject            TEXT NOT NULL,               -- IdP subject id
    email              TEXT NOT NULL DEFAULT '',
    username           TEXT NOT NULL DEFAULT '',
    is_primary         INTEGER NOT NULL DEFAULT 0,  -- the login identity
    is_primary_contact INTEGER NOT NULL DEFAULT 0,  -- the contact email
    privacy            INTEGER NOT NULL DEFAULT 20,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,

    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE,
    UNIQUE (profile_id, provider, email)
);

CREATE INDEX IF NOT EXISTS idx_identities_profile ON identities(profile_id);
CREATE INDEX IF NOT EXISTS idx_identities_subject ON identities(subject);

-- ----------------------------------------------------------------
-- External accounts (alternate emails, websites, service accounts)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS external_accounts (
    id         TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    profile_id TEXT NOT NULL,                -- FK -> profiles(id)
    kind       TEXT NOT NULL,                -- EMAIL / WEBSITE / SERVICE
    identifier TEXT NOT NULL,
    privacy    INTEGER NOT NULL DEFAULT 20,

    FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE,
    UNIQUE (profile_id, kind, identifier)
);

CREATE INDEX IF NOT EXISTS idx_external_accounts_profile
    ON external_accounts(profile_id);

-- ----------------------------------------------------------------
-- Vouches
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS vouches (
    id          TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    vouchee_id  TEXT NOT NULL,               -- FK -> profiles(id)
    voucher_id  TEXT,                        -- nullable, survives voucher deletion
    description TEXT NOT NULL DEFAULT '',
    autovouch   INTEGER NOT NULL DEFAULT 0,
    date        TEXT NOT NULL,

    FOREIGN KEY (vouchee_id) REFERENCES profiles(id) ON DELETE CASCADE,
    FOREIGN KEY (voucher_id) REFERENCES profiles(id) ON DELETE SET NULL,
    UNIQUE (vouchee_id, voucher_id)
);

CREATE INDEX IF NOT EXISTS idx_vouches_vouchee ON vouches(vouchee_id, date);
CREATE INDEX IF NOT EXISTS idx_vouches_voucher ON vouches(voucher_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
