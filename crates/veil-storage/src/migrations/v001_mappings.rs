//! v001: the mapping collection.
//!
//! One row per (scope, category, lookup key). The unique index on
//! (scope, substitute_value) is the backward-lookup path and the last line of
//! defence for the bijection.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS mappings (
    scope             TEXT NOT NULL,
    category          TEXT NOT NULL,
    lookup_key        TEXT NOT NULL,
    substitute_value  TEXT NOT NULL,
    sealed_original   TEXT NOT NULL,
    encrypted         INTEGER NOT NULL DEFAULT 0,
    created_at        TEXT NOT NULL,
    expires_at        TEXT,
    PRIMARY KEY (scope, category, lookup_key)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_mappings_substitute
    ON mappings(scope, substitute_value);
CREATE INDEX IF NOT EXISTS idx_mappings_expires
    ON mappings(expires_at) WHERE expires_at IS NOT NULL;
";
