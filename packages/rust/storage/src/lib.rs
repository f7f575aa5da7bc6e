//! libSQL storage layer (local file mode).
//!
//! The [`Storage`] struct wraps a libSQL database holding the playbook
//! archive and the per-stage generation cache.
//!
//! **Access rules:**
//! - `generate` and `playbooks delete`: read-write via [`Storage::open`]
//! - listing, search and export: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use fluxsales_shared::{FluxSalesError, PlaybookId, Result};
use libsql::{Connection, Database, params};
use uuid::Uuid;

/// Characters of the complete playbook kept as the archive summary.
pub const SUMMARY_CHARS: usize = 300;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A playbook to be archived.
#[derive(Debug, Clone)]
pub struct NewPlaybook<'a> {
    pub facility_name: &'a str,
    pub facility_location: Option<&'a str>,
    pub target_products: &'a [String],
    /// Text of the complete playbook stage; the summary is cut from it.
    pub complete_playbook: &'a str,
    /// The full serialized sales package.
    pub package_json: &'a str,
}

/// Archive listing row (everything except the package body).
#[derive(Debug, Clone)]
pub struct PlaybookSummary {
    pub id: PlaybookId,
    pub created_at: DateTime<Utc>,
    pub facility_name: String,
    pub facility_location: Option<String>,
    pub target_products: Vec<String>,
    pub summary: String,
}

/// An archived playbook with its serialized package.
#[derive(Debug, Clone)]
pub struct StoredPlaybook {
    pub meta: PlaybookSummary,
    pub package_json: String,
}

fn storage_err(e: impl std::fmt::Display) -> FluxSalesError {
    FluxSalesError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FluxSalesError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FluxSalesError::NotFound(format!(
                "playbook database {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        FluxSalesError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(FluxSalesError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Playbook archive
    // -----------------------------------------------------------------------

    /// Archive a generated playbook. Returns its new identifier.
    pub async fn save_playbook(&self, playbook: &NewPlaybook<'_>) -> Result<PlaybookId> {
        self.check_writable()?;
        let id = PlaybookId::new();
        let now = Utc::now().to_rfc3339();
        let products = serde_json::to_string(playbook.target_products).map_err(storage_err)?;
        let summary = summarize_playbook(playbook.complete_playbook);

        self.conn
            .execute(
                "INSERT INTO playbooks
                   (id, created_at, facility_name, facility_location, target_products, summary, package_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    now.as_str(),
                    playbook.facility_name,
                    playbook.facility_location,
                    products.as_str(),
                    summary.as_str(),
                    playbook.package_json,
                ],
            )
            .await
            .map_err(storage_err)?;

        tracing::debug!(%id, facility = playbook.facility_name, "playbook archived");
        Ok(id)
    }

    /// All archived playbooks, newest first.
    pub async fn list_playbooks(&self) -> Result<Vec<PlaybookSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, created_at, facility_name, facility_location, target_products, summary
                 FROM playbooks ORDER BY created_at DESC, id DESC",
                params![],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_summary(&row)?);
        }
        Ok(results)
    }

    /// Playbooks whose facility name or location contains `term`, newest first.
    pub async fn search_playbooks(&self, term: &str) -> Result<Vec<PlaybookSummary>> {
        let pattern = format!("%{}%", term.trim());
        let mut rows = self
            .conn
            .query(
                "SELECT id, created_at, facility_name, facility_location, target_products, summary
                 FROM playbooks
                 WHERE facility_name LIKE ?1 OR facility_location LIKE ?1
                 ORDER BY created_at DESC, id DESC",
                params![pattern.as_str()],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_summary(&row)?);
        }
        Ok(results)
    }

    /// Fetch one playbook with its package body.
    pub async fn get_playbook(&self, id: &PlaybookId) -> Result<Option<StoredPlaybook>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, created_at, facility_name, facility_location, target_products, summary, package_json
                 FROM playbooks WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(StoredPlaybook {
                meta: row_to_summary(&row)?,
                package_json: row.get::<String>(6).map_err(storage_err)?,
            })),
            None => Ok(None),
        }
    }

    /// Delete a playbook. Returns `false` when no such playbook existed.
    pub async fn delete_playbook(&self, id: &PlaybookId) -> Result<bool> {
        self.check_writable()?;
        let affected = self
            .conn
            .execute("DELETE FROM playbooks WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(storage_err)?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Generation cache
    // -----------------------------------------------------------------------

    /// Look up a cached stage output.
    pub async fn get_cached_generation(
        &self,
        stage: &str,
        prompt_hash: &str,
        model_id: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT result_text FROM generation_cache
                 WHERE stage = ?1 AND prompt_hash = ?2 AND model_id = ?3",
                params![stage, prompt_hash, model_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(storage_err)?)),
            None => Ok(None),
        }
    }

    /// Store a stage output (upserts).
    pub async fn set_cached_generation(
        &self,
        stage: &str,
        prompt_hash: &str,
        model_id: &str,
        result_text: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO generation_cache (id, stage, prompt_hash, model_id, result_text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(stage, prompt_hash, model_id) DO UPDATE SET
                   result_text = excluded.result_text,
                   created_at = excluded.created_at",
                params![id.as_str(), stage, prompt_hash, model_id, result_text, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Drop every cached stage output. Returns the number of rows removed.
    pub async fn clear_generation_cache(&self) -> Result<u64> {
        self.check_writable()?;
        self.conn
            .execute("DELETE FROM generation_cache", params![])
            .await
            .map_err(storage_err)
    }
}

/// First [`SUMMARY_CHARS`] characters of `playbook`, with "..." when cut.
pub fn summarize_playbook(playbook: &str) -> String {
    match playbook.char_indices().nth(SUMMARY_CHARS) {
        Some((idx, _)) => format!("{}...", &playbook[..idx]),
        None => playbook.to_string(),
    }
}

fn row_to_summary(row: &libsql::Row) -> Result<PlaybookSummary> {
    let id: String = row.get(0).map_err(storage_err)?;
    let created_at: String = row.get(1).map_err(storage_err)?;
    let products: String = row.get(4).map_err(storage_err)?;

    Ok(PlaybookSummary {
        id: id
            .parse()
            .map_err(|e| FluxSalesError::Storage(format!("invalid playbook id {id}: {e}")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| FluxSalesError::Storage(format!("invalid date: {e}")))?,
        facility_name: row.get(2).map_err(storage_err)?,
        facility_location: row.get::<String>(3).ok(),
        target_products: serde_json::from_str(&products).map_err(storage_err)?,
        summary: row.get(5).map_err(storage_err)?,
    })
}
