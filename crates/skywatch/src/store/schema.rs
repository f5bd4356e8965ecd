//! `SQLite` schema definitions for the skywatch cache store.

/// SQL statement to create the key/value records table.
pub const CREATE_RECORDS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS records (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on `updated_at` for recency queries.
pub const CREATE_UPDATED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_records_updated ON records(updated_at DESC)
";

/// SQL statement to create the metadata table for internal bookkeeping.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_RECORDS_TABLE,
    CREATE_UPDATED_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.trim().is_empty());
        }
    }

    #[test]
    fn test_records_table_keyed_by_key() {
        assert!(CREATE_RECORDS_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_RECORDS_TABLE.contains("value TEXT NOT NULL"));
        assert!(CREATE_RECORDS_TABLE.contains("updated_at TEXT NOT NULL"));
    }
}
