//! SQL schema for the POL SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per dispensing event, partitioned by fuel_type. Control numbers
-- are unique per partition, not globally.
CREATE TABLE IF NOT EXISTS fuel_records (
    record_id      TEXT PRIMARY KEY,
    fuel_type      TEXT NOT NULL,   -- 'adf' | 'xcs'
    date           TEXT NOT NULL,   -- ISO 8601 UTC; when the dispensing occurred
    control_number TEXT NOT NULL,
    purpose        TEXT NOT NULL,
    received_by    TEXT NOT NULL,
    liters         REAL NOT NULL,
    UNIQUE (fuel_type, control_number)
);

CREATE TABLE IF NOT EXISTS pol_users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,   -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS fuel_records_type_idx ON fuel_records(fuel_type);
CREATE INDEX IF NOT EXISTS fuel_records_date_idx ON fuel_records(fuel_type, date);

PRAGMA user_version = 1;
";
