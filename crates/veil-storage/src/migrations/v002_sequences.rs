//! v002: per-(scope, category) counters for `<CATEGORY_n>` tokens.

pub const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS category_sequences (
    scope       TEXT NOT NULL,
    category    TEXT NOT NULL,
    last_value  INTEGER NOT NULL,
    PRIMARY KEY (scope, category)
);
";
