//! SQL migration definitions for the playbook archive.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: playbooks",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per generated sales package
CREATE TABLE IF NOT EXISTS playbooks (
    id                TEXT PRIMARY KEY,
    created_at        TEXT NOT NULL,
    facility_name     TEXT NOT NULL,
    facility_location TEXT,
    target_products   TEXT NOT NULL,
    summary           TEXT NOT NULL,
    package_json      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_playbooks_created ON playbooks(created_at);
CREATE INDEX IF NOT EXISTS idx_playbooks_facility ON playbooks(facility_name);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Generation cache keyed by stage, prompt hash and model",
            sql: r#"
CREATE TABLE IF NOT EXISTS generation_cache (
    id          TEXT PRIMARY KEY,
    stage       TEXT NOT NULL,
    prompt_hash TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    result_text TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE(stage, prompt_hash, model_id)
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
