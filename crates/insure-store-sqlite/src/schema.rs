//! SQL schema for the SQLite store.
//!
//! Every foreign key is `ON DELETE RESTRICT`; callers order deletions
//! themselves (see `insure_core::cascade`).

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Identity ──────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS accounts (
    account_id      TEXT PRIMARY KEY,
    email           TEXT NOT NULL COLLATE NOCASE UNIQUE,
    full_name       TEXT NOT NULL,
    password_hash   TEXT NOT NULL,   -- argon2 PHC string
    email_confirmed INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL    -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS account_roles (
    account_id TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE RESTRICT,
    role       TEXT NOT NULL,        -- 'Admin' | 'Agent' | 'Client'
    PRIMARY KEY (account_id, role)
);

-- Only the SHA-256 digest of a token is ever stored.
CREATE TABLE IF NOT EXISTS account_tokens (
    token_hash TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(account_id) ON DELETE RESTRICT,
    purpose    TEXT NOT NULL,        -- 'confirm_email' | 'reset_password'
    expires_at TEXT NOT NULL
);

-- ── Domain ────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS persons (
    person_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name     TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,     -- YYYY-MM-DD
    phone         TEXT NOT NULL DEFAULT '',
    street        TEXT NOT NULL DEFAULT '',
    city          TEXT NOT NULL DEFAULT '',
    country       TEXT NOT NULL DEFAULT '',
    post_code     TEXT NOT NULL DEFAULT '',
    identity_id   TEXT UNIQUE REFERENCES accounts(account_id) ON DELETE RESTRICT,
    version       INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS insurances (
    insurance_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name         TEXT NOT NULL,
    subject      TEXT NOT NULL,
    amount       INTEGER NOT NULL,
    valid_from   TEXT NOT NULL,
    valid_to     TEXT NOT NULL,
    person_id    INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE RESTRICT,
    version      INTEGER NOT NULL DEFAULT 1
);

-- No uniqueness on (insurance_id, person_id, role): duplicate insured rows
-- are allowed on create.
CREATE TABLE IF NOT EXISTS participants (
    participant_id INTEGER PRIMARY KEY AUTOINCREMENT,
    role           TEXT NOT NULL,    -- 'policy_holder' | 'insured'
    insurance_id   INTEGER NOT NULL REFERENCES insurances(insurance_id) ON DELETE RESTRICT,
    person_id      INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS claims (
    claim_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    description      TEXT NOT NULL,
    occurred_on      TEXT NOT NULL,
    estimated_damage TEXT NOT NULL,  -- decimal string
    status           TEXT NOT NULL DEFAULT 'new',
    insurance_id     INTEGER NOT NULL REFERENCES insurances(insurance_id) ON DELETE RESTRICT,
    person_id        INTEGER NOT NULL REFERENCES persons(person_id) ON DELETE RESTRICT,
    version          INTEGER NOT NULL DEFAULT 1
);

-- ── Notifications ─────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS outbox (
    message_id INTEGER PRIMARY KEY AUTOINCREMENT,
    to_address TEXT NOT NULL,
    subject    TEXT NOT NULL,
    body_html  TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS participants_insurance_idx ON participants(insurance_id);
CREATE INDEX IF NOT EXISTS participants_person_idx    ON participants(person_id);
CREATE INDEX IF NOT EXISTS claims_insurance_idx       ON claims(insurance_id);
CREATE INDEX IF NOT EXISTS claims_person_idx          ON claims(person_id);
CREATE INDEX IF NOT EXISTS insurances_person_idx      ON insurances(person_id);

PRAGMA user_version = 1;
";
