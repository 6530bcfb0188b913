//! Persistence boundary for generated document records.
//!
//! The batch scheduler hands every successful row to a [`RecordStore`] in one
//! bulk call after the archive exists. [`SqliteRecordStore`] keeps the records
//! in the service's SQLite database.

use crate::pipeline::error::Result;
use common::model::record::{DocumentRecord, GenerationId, UpsertFailure, UpsertReport};
use log::{debug, warn};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// Bulk upsert of document records.
///
/// An `Err` means the whole call failed. Per-record problems are reported in
/// [`UpsertReport::failures`] instead.
pub trait RecordStore {
    fn bulk_upsert(&self, records: &[DocumentRecord]) -> Result<UpsertReport>;
}

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS issued_documents (
    id TEXT PRIMARY KEY,
    recipient_label TEXT NOT NULL,
    title TEXT NOT NULL,
    issuer_label TEXT NOT NULL,
    issued_at TEXT NOT NULL,
    metadata TEXT NOT NULL,
    thumbnail TEXT
)";

const UPSERT: &str = "INSERT INTO issued_documents
    (id, recipient_label, title, issuer_label, issued_at, metadata, thumbnail)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        recipient_label = excluded.recipient_label,
        title = excluded.title,
        issuer_label = excluded.issuer_label,
        issued_at = excluded.issued_at,
        metadata = excluded.metadata,
        thumbnail = excluded.thumbnail";

/// Record store backed by a SQLite file. A connection is opened per call and
/// the table is created on first use.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    path: PathBuf,
}

impl SqliteRecordStore {
    /// Points at `path` without touching the file yet.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Opens (and if needed creates) the database and its table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::new(path);
        store.connect()?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(conn)
    }

    /// Looks up a record by generation ID.
    pub fn find(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, recipient_label, title, issuer_label, issued_at, metadata, thumbnail
                 FROM issued_documents WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(
            |(id, recipient_label, title, issuer_label, issued_at, metadata, thumbnail)| {
                let metadata = serde_json::from_str(&metadata).unwrap_or_else(|e| {
                    warn!("record {} has unreadable metadata: {}", id, e);
                    serde_json::Value::Null
                });
                DocumentRecord {
                    id: GenerationId::new(id),
                    recipient_label,
                    title,
                    issuer_label,
                    issued_at,
                    metadata,
                    thumbnail,
                }
            },
        ))
    }
}

impl RecordStore for SqliteRecordStore {
    fn bulk_upsert(&self, records: &[DocumentRecord]) -> Result<UpsertReport> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let mut report = UpsertReport::default();

        {
            let mut stmt = tx.prepare(UPSERT)?;
            for record in records {
                let result = stmt.execute(params![
                    record.id.as_str(),
                    record.recipient_label,
                    record.title,
                    record.issuer_label,
                    record.issued_at,
                    record.metadata.to_string(),
                    record.thumbnail,
                ]);
                match result {
                    Ok(_) => report.created_count += 1,
                    Err(e) => {
                        warn!("could not store record {}: {}", record.id, e);
                        report.failures.push(UpsertFailure {
                            id: record.id.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        tx.commit()?;
        debug!(
            "stored {} records ({} failures)",
            report.created_count,
            report.failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, label: &str) -> DocumentRecord {
        DocumentRecord {
            id: GenerationId::new(id),
            recipient_label: label.into(),
            title: "Certificate".into(),
            issuer_label: "Academy".into(),
            issued_at: "2026-01-01T00:00:00+00:00".into(),
            metadata: json!({ "row": { "name": label } }),
            thumbnail: Some("iVBORw0KGgo=".into()),
        }
    }

    #[test]
    fn upserts_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRecordStore::open(dir.path().join("records.sqlite")).unwrap();

        let report = store
            .bulk_upsert(&[record("aaa", "Ada"), record("bbb", "Grace")])
            .unwrap();
        assert_eq!(report.created_count, 2);
        assert!(report.failures.is_empty());

        let found = store.find("bbb").unwrap().unwrap();
        assert_eq!(found, record("bbb", "Grace"));
        assert!(store.find("zzz").unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRecordStore::open(dir.path().join("records.sqlite")).unwrap();
        store.bulk_upsert(&[record("aaa", "Ada")]).unwrap();
        store.bulk_upsert(&[record("aaa", "Ada King")]).unwrap();

        let found = store.find("aaa").unwrap().unwrap();
        assert_eq!(found.recipient_label, "Ada King");
    }

    #[test]
    fn corrupt_metadata_reads_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteRecordStore::open(dir.path().join("records.sqlite")).unwrap();
        store.bulk_upsert(&[record("aaa", "Ada")]).unwrap();
        store
            .connect()
            .unwrap()
            .execute(
                "UPDATE issued_documents SET metadata = '{not json' WHERE id = 'aaa'",
                [],
            )
            .unwrap();

        let found = store.find("aaa").unwrap().unwrap();
        assert_eq!(found.metadata, serde_json::Value::Null);
        assert_eq!(found.recipient_label, "Ada");
    }

    #[test]
    fn unreachable_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as a database file
        assert!(SqliteRecordStore::open(dir.path()).is_err());

        let lazy = SqliteRecordStore::new(dir.path());
        assert!(lazy.bulk_upsert(&[record("aaa", "Ada")]).is_err());
    }
}
