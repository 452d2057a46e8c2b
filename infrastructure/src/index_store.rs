//! On-disk vector index.
//!
//! The whole index lives in one SQLite file. A build writes a fresh file next
//! to the live one and renames it into place, so readers only ever see the
//! previous index or the complete new one.

use domain::error::{PipelineError, PipelineResult};
use domain::models::{Embedding, IndexManifest, VectorIndex};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace whatever index is stored with `index`.
    pub fn save(&self, index: &VectorIndex) -> PipelineResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let staging = self.staging_path();
        if staging.exists() {
            fs::remove_file(&staging)?;
        }

        if let Err(e) = write_index(&staging, index) {
            if let Err(cleanup) = fs::remove_file(&staging) {
                warn!(path = %staging.display(), error = %cleanup, "could not remove staging index");
            }
            return Err(e);
        }
        fs::rename(&staging, &self.path)?;
        info!(
            path = %self.path.display(),
            chunks = index.len(),
            "index persisted"
        );
        Ok(())
    }

    pub fn load(&self) -> PipelineResult<VectorIndex> {
        let conn = self.open_read_only()?;
        let manifest = read_manifest(&conn)?;

        let mut stmt = conn
            .prepare("SELECT position, vector, text FROM embeddings ORDER BY position")
            .map_err(PipelineError::storage)?;
        let mut rows = stmt.query([]).map_err(PipelineError::storage)?;
        let mut entries = Vec::with_capacity(manifest.chunk_count);
        while let Some(row) = rows.next().map_err(PipelineError::storage)? {
            let position: i64 = row.get(0).map_err(PipelineError::storage)?;
            let vector_bytes: Vec<u8> = row.get(1).map_err(PipelineError::storage)?;
            let text: String = row.get(2).map_err(PipelineError::storage)?;
            let vector: Vec<f32> =
                serde_json::from_slice(&vector_bytes).map_err(PipelineError::storage)?;
            if vector.len() != manifest.dimension {
                return Err(PipelineError::DimensionMismatch {
                    expected: manifest.dimension,
                    actual: vector.len(),
                });
            }
            entries.push(Embedding {
                position: position as usize,
                vector,
                text,
            });
        }
        if entries.len() != manifest.chunk_count {
            return Err(PipelineError::Storage(format!(
                "manifest lists {} chunks but {} are stored",
                manifest.chunk_count,
                entries.len()
            )));
        }
        debug!(path = %self.path.display(), chunks = entries.len(), "index loaded");
        Ok(VectorIndex { manifest, entries })
    }

    /// Read only the manifest, without loading vectors.
    pub fn load_manifest(&self) -> PipelineResult<IndexManifest> {
        let conn = self.open_read_only()?;
        read_manifest(&conn)
    }

    fn open_read_only(&self) -> PipelineResult<Connection> {
        if !self.exists() {
            return Err(PipelineError::IndexNotFound(self.path.clone()));
        }
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(PipelineError::storage)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".building");
        self.path.with_file_name(name)
    }
}

fn setup_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA synchronous=NORMAL;
        PRAGMA cache_size=-64000;
        PRAGMA temp_store=MEMORY;
        CREATE TABLE manifest (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            body TEXT NOT NULL
        );
        CREATE TABLE embeddings (
            position INTEGER PRIMARY KEY,
            vector BLOB NOT NULL,
            text TEXT NOT NULL
        );
    ",
    )
}

fn write_index(path: &Path, index: &VectorIndex) -> PipelineResult<()> {
    let mut conn = Connection::open(path).map_err(PipelineError::storage)?;
    setup_db(&conn).map_err(PipelineError::storage)?;

    let tx = conn.transaction().map_err(PipelineError::storage)?;
    {
        let manifest = serde_json::to_string(&index.manifest).map_err(PipelineError::storage)?;
        tx.execute(
            "INSERT INTO manifest (id, body) VALUES (1, ?1)",
            params![manifest],
        )
        .map_err(PipelineError::storage)?;

        let mut stmt = tx
            .prepare("INSERT INTO embeddings (position, vector, text) VALUES (?1, ?2, ?3)")
            .map_err(PipelineError::storage)?;
        for embedding in &index.entries {
            let vector_bytes = serde_json::to_vec(&embedding.vector).map_err(PipelineError::storage)?;
            stmt.execute(params![
                embedding.position as i64,
                vector_bytes,
                embedding.text
            ])
            .map_err(PipelineError::storage)?;
        }
    }
    tx.commit().map_err(PipelineError::storage)?;
    conn.close().map_err(|(_, e)| PipelineError::storage(e))?;
    Ok(())
}

fn read_manifest(conn: &Connection) -> PipelineResult<IndexManifest> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM manifest WHERE id = 1", [], |row| row.get(0))
        .optional()
        .map_err(PipelineError::storage)?;
    let body = body.ok_or_else(|| PipelineError::Storage("index has no manifest".to_string()))?;
    serde_json::from_str(&body).map_err(PipelineError::storage)
}
