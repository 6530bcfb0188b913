use crate::model::record::{GenerationId, PersistenceSummary, RowError};
use serde::{Deserialize, Serialize};

/// What each generated row contributes to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Single-page PDF with clickable link regions.
    #[default]
    Pdf,
    /// The rasterized page as PNG, without link regions.
    Png,
}

impl OutputMode {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputMode::Pdf => "pdf",
            OutputMode::Png => "png",
        }
    }
}

/// Per-job options supplied by the caller. Anything left out falls back to the
/// service configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    pub output_mode: OutputMode,
    /// Column whose value names the recipient in file names and records.
    pub recipient_column: Option<String>,
    pub title: Option<String>,
    pub issuer_label: Option<String>,
    /// Rows processed between two cooperative yields.
    pub yield_every: Option<usize>,
}

/// Lifecycle of a batch job.
///
/// `Idle → Running → {Completed, Cancelled, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Idle,
    Running,
    /// Every row was visited and the archive was finalized.
    Completed,
    /// The cancellation predicate stopped the loop; generated rows are kept.
    Cancelled,
    /// An error escaped per-row isolation.
    Failed,
}

/// Serializable view of a finished job, without the archive bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub state: BatchState,
    pub success: bool,
    pub total_generated: usize,
    pub errors: Vec<RowError>,
    pub ids: Vec<GenerationId>,
    pub persistence: PersistenceSummary,
    pub archive_size: usize,
}
