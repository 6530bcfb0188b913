use serde::{Deserialize, Serialize};
use std::fmt;

/// Short identifier assigned to one generated document.
///
/// The same value is embedded in the code mark, used as the link annotation
/// target, appended to the archive file name and stored as the record key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A failure attached to a row of the job. Index `-1` marks a job-level failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub index: i64,
    pub message: String,
}

/// What is handed to the persistence boundary for each generated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: GenerationId,
    pub recipient_label: String,
    pub title: String,
    pub issuer_label: String,
    /// RFC 3339 timestamp.
    pub issued_at: String,
    pub metadata: serde_json::Value,
    /// Base64 PNG preview.
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertFailure {
    pub id: GenerationId,
    pub message: String,
}

/// Answer of a bulk upsert.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReport {
    pub created_count: usize,
    pub failures: Vec<UpsertFailure>,
}

/// How the hand-off to the persistence boundary ended. Never affects job success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PersistenceSummary {
    /// Nothing was generated, so nothing was sent.
    Skipped,
    Stored { report: UpsertReport },
    Failed { message: String },
}
