//! # Batch Scheduler
//!
//! Runs one personalization job: for every data row it allocates a generation
//! ID, instantiates the template, rasterizes the scene, encodes the output and
//! adds it to the archive. When the loop ends the archive is finalized and the
//! generated records are handed to the persistence boundary in one call.
//!
//! ## Scheduling
//!
//! [`BatchScheduler::run`] is an `async fn` that executes on the caller's task.
//! Every `yield_every` rows it awaits [`tokio::task::yield_now`] so a long batch
//! never holds the executor continuously. Cancellation is cooperative: the
//! predicate is evaluated at the top of each row, never in the middle of one.
//!
//! ## Failure isolation
//!
//! - An error while processing a row is recorded as `{index, message}`, reported
//!   through [`BatchObserver::on_error`], and the loop moves on.
//! - An error outside the row loop (invalid template, archive finalization)
//!   ends the job in [`BatchState::Failed`] with one synthetic error at index `-1`.
//! - A persistence failure is logged and surfaced in the result but never
//!   changes `success`.

use crate::pipeline::archive::{entry_name, ArchiveBuilder};
use crate::pipeline::compose::{thumbnail_png, DocumentComposer};
use crate::pipeline::error::{PipelineError, Result};
use crate::pipeline::ids::IdAllocator;
use crate::pipeline::instantiate::TemplateInstantiator;
use crate::pipeline::persist::RecordStore;
use crate::pipeline::raster::Rasterizer;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::model::batch::{BatchState, JobSummary, OutputMode};
use common::model::record::{DocumentRecord, GenerationId, PersistenceSummary, RowError};
use common::model::row::{DataRow, Scalar};
use common::model::template::Template;
use log::{debug, error, info, warn};
use serde_json::json;

/// Rows processed between two cooperative yields unless configured otherwise.
pub const DEFAULT_YIELD_EVERY: usize = 5;

/// Width of the PNG preview stored with each record.
pub const THUMBNAIL_WIDTH: u32 = 240;

/// Event surface of a running job. Every method has an empty default.
pub trait BatchObserver {
    /// Called after each row with the number of rows visited so far.
    fn on_progress(&mut self, _current: usize, _total: usize, _status: &str) {}
    fn on_error(&mut self, _index: usize, _message: &str) {}
    fn on_row_complete(&mut self, _id: &GenerationId, _record: &DocumentRecord) {}
    /// Archive compression progress in percent.
    fn on_archive_progress(&mut self, _percent: f32) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Settings fixed for the duration of one job.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub multiplier: f32,
    pub yield_every: usize,
    pub output_mode: OutputMode,
    pub recipient_column: Option<String>,
    pub title: String,
    pub issuer_label: String,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            multiplier: crate::pipeline::raster::multiplier_for_dpi(
                crate::pipeline::raster::PRINT_DPI,
            ),
            yield_every: DEFAULT_YIELD_EVERY,
            output_mode: OutputMode::Pdf,
            recipient_column: None,
            title: "Certificate".to_string(),
            issuer_label: "Issuer".to_string(),
        }
    }
}

/// A row that produced a document.
#[derive(Debug, Clone)]
pub struct GeneratedRow {
    pub index: usize,
    pub id: GenerationId,
    pub recipient_label: String,
    /// Archive entry holding the row's output bytes.
    pub filename: String,
    pub output_size: usize,
    pub thumbnail: String,
    pub record: DocumentRecord,
}

/// Result of one row. Never changed once created.
#[derive(Debug, Clone)]
pub enum RowOutcome {
    Generated(GeneratedRow),
    Failed(RowError),
}

/// Aggregate result of a job, created once when the job ends.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub state: BatchState,
    pub success: bool,
    pub total_generated: usize,
    pub errors: Vec<RowError>,
    pub ids: Vec<GenerationId>,
    pub archive: Option<Vec<u8>>,
    pub persistence: PersistenceSummary,
    pub rows: Vec<GeneratedRow>,
}

impl JobResult {
    /// A job that ended before any row could be kept.
    pub fn failed(message: String) -> Self {
        Self {
            state: BatchState::Failed,
            success: false,
            total_generated: 0,
            errors: vec![RowError { index: -1, message }],
            ids: Vec::new(),
            archive: None,
            persistence: PersistenceSummary::Skipped,
            rows: Vec::new(),
        }
    }

    pub fn summary(&self, job_id: &str) -> JobSummary {
        JobSummary {
            job_id: job_id.to_string(),
            state: self.state,
            success: self.success,
            total_generated: self.total_generated,
            errors: self.errors.clone(),
            ids: self.ids.clone(),
            persistence: self.persistence.clone(),
            archive_size: self.archive.as_ref().map(Vec::len).unwrap_or(0),
        }
    }
}

pub struct BatchScheduler<R, S> {
    instantiator: TemplateInstantiator,
    rasterizer: R,
    composer: DocumentComposer,
    store: S,
    settings: JobSettings,
    state: BatchState,
}

impl<R: Rasterizer, S: RecordStore> BatchScheduler<R, S> {
    pub fn new(
        instantiator: TemplateInstantiator,
        rasterizer: R,
        composer: DocumentComposer,
        store: S,
        settings: JobSettings,
    ) -> Self {
        Self {
            instantiator,
            rasterizer,
            composer,
            store,
            settings,
            state: BatchState::Idle,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Processes `rows` against `template` and returns the job result.
    ///
    /// `is_cancelled` is checked before every row. Rows already processed when
    /// it returns `true` stay in the result, which then ends in
    /// [`BatchState::Cancelled`].
    pub async fn run<O, C>(
        &mut self,
        template: &Template,
        rows: &[DataRow],
        observer: &mut O,
        is_cancelled: C,
    ) -> JobResult
    where
        O: BatchObserver,
        C: Fn() -> bool,
    {
        self.state = BatchState::Running;
        let total = rows.len();
        info!(
            "batch started: {} rows, {:?} output, yield every {} rows",
            total, self.settings.output_mode, self.settings.yield_every
        );

        if let Err(e) = template.validate() {
            return self.fail(PipelineError::InvalidTemplate(e));
        }
        if !template.has_verification_link() {
            info!("template has no verification link node, documents will carry no link annotation");
        }

        let yield_every = self.settings.yield_every.max(1);
        let mut allocator = IdAllocator::new();
        let mut archive = ArchiveBuilder::new();
        let mut outcomes = Vec::with_capacity(total);
        let mut cancelled = false;

        for (index, row) in rows.iter().enumerate() {
            if is_cancelled() {
                info!("batch cancelled before row {} of {}", index + 1, total);
                cancelled = true;
                break;
            }

            let status = match self.process_row(index, row, template, &mut allocator, &mut archive) {
                Ok(generated) => {
                    observer.on_row_complete(&generated.id, &generated.record);
                    let status = format!(
                        "Generated {} for {}",
                        generated.id, generated.recipient_label
                    );
                    outcomes.push(RowOutcome::Generated(generated));
                    status
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("row {} failed: {}", index, message);
                    observer.on_error(index, &message);
                    outcomes.push(RowOutcome::Failed(RowError {
                        index: index as i64,
                        message,
                    }));
                    format!("Row {} failed", index + 1)
                }
            };
            observer.on_progress(index + 1, total, &status);

            if (index + 1) % yield_every == 0 {
                tokio::task::yield_now().await;
            }
        }

        let mut generated = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                RowOutcome::Generated(row) => generated.push(row),
                RowOutcome::Failed(err) => errors.push(err),
            }
        }

        let archive = match archive.finalize(|percent| observer.on_archive_progress(percent)) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e),
        };

        let persistence = self.persist(&generated);

        self.state = if cancelled {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };
        let result = JobResult {
            state: self.state,
            success: errors.is_empty(),
            total_generated: generated.len(),
            ids: generated.iter().map(|g| g.id.clone()).collect(),
            errors,
            archive: Some(archive),
            persistence,
            rows: generated,
        };
        info!(
            "batch {:?}: {} generated, {} failed, archive {} bytes",
            result.state,
            result.total_generated,
            result.errors.len(),
            result.archive.as_ref().map(Vec::len).unwrap_or(0)
        );
        result
    }

    fn fail(&mut self, e: PipelineError) -> JobResult {
        error!("batch failed: {}", e);
        self.state = BatchState::Failed;
        JobResult::failed(e.to_string())
    }

    fn process_row(
        &mut self,
        index: usize,
        row: &DataRow,
        template: &Template,
        allocator: &mut IdAllocator,
        archive: &mut ArchiveBuilder,
    ) -> Result<GeneratedRow> {
        let id = allocator.allocate();
        let instantiated = self.instantiator.instantiate(template, row, &id)?;
        if !instantiated.unresolved_columns.is_empty() {
            warn!(
                "row {}: columns {:?} missing, placeholder text kept in {}",
                index, instantiated.unresolved_columns, id
            );
        }

        let bitmap = self
            .rasterizer
            .rasterize(&instantiated.scene, self.settings.multiplier)?;
        debug!(
            "row {} rasterized at {}x{}",
            index,
            bitmap.width(),
            bitmap.height()
        );

        let mode = self.settings.output_mode;
        let output = self.composer.render(
            mode,
            &bitmap,
            (template.width, template.height),
            &instantiated.regions,
            &id,
        )?;
        let thumbnail = BASE64.encode(thumbnail_png(&bitmap, THUMBNAIL_WIDTH)?);

        let recipient_label =
            recipient_label(row, self.settings.recipient_column.as_deref(), index);
        let filename = entry_name(&recipient_label, &id, mode.extension());
        let output_size = output.len();
        archive.add_entry(filename.clone(), output)?;

        let record = DocumentRecord {
            id: id.clone(),
            recipient_label: recipient_label.clone(),
            title: self.settings.title.clone(),
            issuer_label: self.settings.issuer_label.clone(),
            issued_at: chrono::Utc::now().to_rfc3339(),
            metadata: json!({
                "row": row,
                "rowIndex": index,
                "verificationUrl": instantiated.verification_url,
                "file": filename,
                "unresolvedColumns": instantiated.unresolved_columns,
            }),
            thumbnail: Some(thumbnail.clone()),
        };

        Ok(GeneratedRow {
            index,
            id,
            recipient_label,
            filename,
            output_size,
            thumbnail,
            record,
        })
    }

    fn persist(&self, generated: &[GeneratedRow]) -> PersistenceSummary {
        if generated.is_empty() {
            return PersistenceSummary::Skipped;
        }
        let records: Vec<DocumentRecord> = generated.iter().map(|g| g.record.clone()).collect();
        match self.store.bulk_upsert(&records) {
            Ok(report) => {
                if !report.failures.is_empty() {
                    warn!(
                        "{} of {} records were not stored",
                        report.failures.len(),
                        records.len()
                    );
                }
                PersistenceSummary::Stored { report }
            }
            Err(e) => {
                warn!("storing {} records failed: {}", records.len(), e);
                PersistenceSummary::Failed {
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Label naming the recipient of a row: the configured column's value when
/// present and non-empty, otherwise `recipient_{n}` with a 1-based row number.
pub fn recipient_label(row: &DataRow, column: Option<&str>, index: usize) -> String {
    column
        .and_then(|c| row.get(c))
        .filter(|v| !matches!(v, Scalar::Null))
        .map(|v| v.to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("recipient_{}", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::code_mark::CodeMarkGenerator;
    use crate::pipeline::compose::PageSize;
    use crate::pipeline::raster::output_size;
    use crate::pipeline::scene::SceneGraph;
    use common::model::record::UpsertReport;
    use common::model::template::{Frame, Node, TextStyle, VariableNode};
    use image::RgbaImage;
    use std::cell::{Cell, RefCell};

    /// Fails on any scene whose variable text is `boom`.
    struct FlakyRasterizer;

    impl Rasterizer for FlakyRasterizer {
        fn rasterize(&mut self, scene: &SceneGraph, multiplier: f32) -> Result<RgbaImage> {
            let boom = scene.nodes.iter().any(
                |n| matches!(n, Node::Variable(v) if v.display_text == "boom"),
            );
            if boom {
                return Err(PipelineError::Raster("cannot draw boom".into()));
            }
            let (w, h) = output_size(scene.width, scene.height, multiplier);
            Ok(RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255])))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: RefCell<Vec<DocumentRecord>>,
        fail: bool,
    }

    impl RecordStore for MemoryStore {
        fn bulk_upsert(&self, records: &[DocumentRecord]) -> Result<UpsertReport> {
            if self.fail {
                return Err(PipelineError::DataSource("store offline".into()));
            }
            self.records.borrow_mut().extend_from_slice(records);
            Ok(UpsertReport {
                created_count: records.len(),
                failures: vec![],
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        progress: Vec<(usize, usize)>,
        errors: Vec<usize>,
        completed: Vec<GenerationId>,
        archive_progress: Vec<f32>,
    }

    impl BatchObserver for Recorder {
        fn on_progress(&mut self, current: usize, total: usize, _status: &str) {
            self.progress.push((current, total));
        }
        fn on_error(&mut self, index: usize, _message: &str) {
            self.errors.push(index);
        }
        fn on_row_complete(&mut self, id: &GenerationId, _record: &DocumentRecord) {
            self.completed.push(id.clone());
        }
        fn on_archive_progress(&mut self, percent: f32) {
            self.archive_progress.push(percent);
        }
    }

    fn template() -> Template {
        Template {
            width: 80.0,
            height: 60.0,
            background_color: "#ffffff".into(),
            nodes: vec![Node::Variable(VariableNode {
                frame: Frame::new(0.0, 0.0, 40.0, 10.0),
                bound_column: "name".into(),
                display_text: "{{name}}".into(),
                style: TextStyle::default(),
                placeholder_style: None,
            })],
        }
    }

    fn scheduler(store: MemoryStore) -> BatchScheduler<FlakyRasterizer, MemoryStore> {
        BatchScheduler::new(
            TemplateInstantiator::new("https://v.example/verify", CodeMarkGenerator::default()),
            FlakyRasterizer,
            DocumentComposer::new(PageSize::default(), "Certificate"),
            store,
            JobSettings {
                multiplier: 1.0,
                recipient_column: Some("name".into()),
                ..JobSettings::default()
            },
        )
    }

    fn rows(names: &[&str]) -> Vec<DataRow> {
        names
            .iter()
            .map(|n| DataRow::new().with("name", *n))
            .collect()
    }

    #[tokio::test]
    async fn row_failure_does_not_abort_the_batch() {
        let mut s = scheduler(MemoryStore::default());
        let mut recorder = Recorder::default();
        let rows = rows(&["a", "b", "boom", "d", "e"]);

        let result = s.run(&template(), &rows, &mut recorder, || false).await;

        assert_eq!(result.state, BatchState::Completed);
        assert!(!result.success);
        assert_eq!(result.total_generated, 4);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].index, 2);
        assert_eq!(recorder.errors, vec![2]);
        assert_eq!(recorder.progress.len(), 5);
        assert_eq!(recorder.progress.last(), Some(&(5, 5)));
        assert_eq!(recorder.completed, result.ids);
        assert_eq!(recorder.archive_progress.last(), Some(&100.0));
        assert_eq!(s.state(), BatchState::Completed);
        assert_eq!(s.store().records.borrow().len(), 4);
    }

    #[tokio::test]
    async fn cancellation_keeps_processed_rows() {
        let mut s = scheduler(MemoryStore::default());
        let checks = Cell::new(0usize);
        let rows = rows(&["a", "b", "c", "d", "e"]);

        // cancel once two rows have been processed
        let result = s
            .run(&template(), &rows, &mut NoopObserver, || {
                let seen = checks.get();
                checks.set(seen + 1);
                seen >= 2
            })
            .await;

        assert_eq!(result.state, BatchState::Cancelled);
        assert!(result.success);
        assert_eq!(result.total_generated, 2);
        assert_eq!(result.ids.len() + result.errors.len(), 2);
        assert!(result.archive.is_some());
    }

    #[tokio::test]
    async fn cancelled_before_first_row() {
        let mut s = scheduler(MemoryStore::default());
        let result = s
            .run(&template(), &rows(&["a"]), &mut NoopObserver, || true)
            .await;
        assert_eq!(result.state, BatchState::Cancelled);
        assert_eq!(result.total_generated, 0);
        assert_eq!(result.persistence, PersistenceSummary::Skipped);
    }

    #[tokio::test]
    async fn persistence_failure_keeps_success() {
        let mut s = scheduler(MemoryStore {
            fail: true,
            ..MemoryStore::default()
        });
        let result = s
            .run(&template(), &rows(&["a", "b"]), &mut NoopObserver, || false)
            .await;
        assert!(result.success);
        assert_eq!(result.state, BatchState::Completed);
        assert!(matches!(result.persistence, PersistenceSummary::Failed { .. }));
    }

    #[tokio::test]
    async fn invalid_template_fails_the_job() {
        let mut s = scheduler(MemoryStore::default());
        let mut bad = template();
        bad.width = 0.0;
        let result = s.run(&bad, &rows(&["a"]), &mut NoopObserver, || false).await;
        assert_eq!(result.state, BatchState::Failed);
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].index, -1);
        assert!(result.archive.is_none());
        assert_eq!(s.state(), BatchState::Failed);
    }

    #[tokio::test]
    async fn records_carry_row_metadata() {
        let mut s = scheduler(MemoryStore::default());
        let result = s
            .run(&template(), &rows(&["Ada"]), &mut NoopObserver, || false)
            .await;
        let record = &result.rows[0].record;
        assert_eq!(record.recipient_label, "Ada");
        assert_eq!(record.id, result.ids[0]);
        assert_eq!(record.metadata["row"]["name"], "Ada");
        assert!(record.metadata["verificationUrl"]
            .as_str()
            .unwrap()
            .ends_with(result.ids[0].as_str()));
        assert!(result.rows[0].filename.starts_with("Ada_"));
    }

    #[test]
    fn recipient_label_fallbacks() {
        let row = DataRow::new()
            .with("name", "  ")
            .with("email", "a@b.c")
            .with("gone", Scalar::Null);
        assert_eq!(recipient_label(&row, Some("email"), 0), "a@b.c");
        assert_eq!(recipient_label(&row, Some("name"), 3), "recipient_4");
        assert_eq!(recipient_label(&row, Some("gone"), 0), "recipient_1");
        assert_eq!(recipient_label(&row, None, 1), "recipient_2");
    }
}
