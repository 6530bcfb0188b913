//! # Batch Job Start Service
//!
//! Provides `POST /api/batch/start`, which turns a template and a set of data
//! rows into one document per row, bundled into a zip archive.
//!
//! ## Workflow:
//!
//! 1.  **HTTP Request**: `process` receives a `StartBatchRequest`. Rows come as
//!     JSON objects or as CSV text; the template is validated before anything
//!     is scheduled, so a broken template is answered with `400 Bad Request`.
//!
//! 2.  **Job Scheduling**: `schedule_batch_job` creates a `job_id`, registers it
//!     as `Pending` together with a cancellation flag, spawns the job and
//!     returns the ID right away. `supervise_batch_job` watches the spawned
//!     task and marks the job `Failed` if it panics.
//!
//! 3.  **Background Processing**: `run_batch_job` drives a `BatchScheduler` on
//!     the runtime. The scheduler yields every few rows, so other requests
//!     (status polls, cancellations) are served while a batch runs.
//!
//! 4.  **Progress Reporting**: The scheduler reports through a `ChannelObserver`,
//!     which forwards `BatchUpdate`s to a per-job listener. The listener turns
//!     them into `JobStatus::InProgress` for the central job controller and
//!     records row failures as they happen. Rows cover 0 to 90 percent,
//!     archive compression the rest.
//!
//! 5.  **Completion**: The result is stored in `JobsState::results` before the
//!     final status is sent, so a client that sees `Completed` can fetch it.

use crate::job_controller::state::{FinishedJob, JobUpdate, JobsState};
use crate::pipeline::scheduler::{BatchObserver, JobResult, JobSettings};
use crate::services::batch::BatchContext;
use crate::services::data_sources::csv::rows_from_csv;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;
use common::model::batch::BatchState;
use common::model::record::{DocumentRecord, GenerationId, RowError};
use common::model::row::DataRow;
use common::model::template::Template;
use common::requests::StartBatchRequest;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Share of the progress bar taken by the row loop.
const ROWS_PERCENT: f32 = 90.0;

/// Progress of a running batch, sent from the scheduler to the job's listener.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchUpdate {
    Row { current: usize, total: usize },
    RowFailed { index: usize, message: String },
    Archive(f32),
}

impl BatchUpdate {
    /// Overall progress, or `None` for updates that do not move it.
    pub fn percent(&self) -> Option<u32> {
        let percent = match self {
            BatchUpdate::Row { current, total } if *total > 0 => {
                *current as f32 / *total as f32 * ROWS_PERCENT
            }
            BatchUpdate::Row { .. } => ROWS_PERCENT,
            BatchUpdate::RowFailed { .. } => return None,
            BatchUpdate::Archive(p) => ROWS_PERCENT + p.clamp(0.0, 100.0) * (100.0 - ROWS_PERCENT) / 100.0,
        };
        Some(percent as u32)
    }
}

/// Forwards scheduler events into the job's update channel.
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<BatchUpdate>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<BatchUpdate>) -> Self {
        Self { tx }
    }
}

impl BatchObserver for ChannelObserver {
    fn on_progress(&mut self, current: usize, total: usize, status: &str) {
        debug!("{}/{}: {}", current, total, status);
        let _ = self.tx.send(BatchUpdate::Row { current, total });
    }

    fn on_error(&mut self, index: usize, message: &str) {
        let _ = self.tx.send(BatchUpdate::RowFailed {
            index,
            message: message.to_string(),
        });
    }

    fn on_row_complete(&mut self, id: &GenerationId, record: &DocumentRecord) {
        debug!("generated {} for {}", id, record.recipient_label);
    }

    fn on_archive_progress(&mut self, percent: f32) {
        let _ = self.tx.send(BatchUpdate::Archive(percent));
    }
}

/// The Actix web handler for `POST /api/batch/start`.
pub(crate) async fn process(
    state: web::Data<JobsState>,
    ctx: web::Data<BatchContext>,
    payload: web::Json<StartBatchRequest>,
) -> impl Responder {
    match schedule_batch_job(state, ctx, payload.into_inner()).await {
        Ok(job_id) => HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id })),
        Err(err) => HttpResponse::BadRequest().body(err),
    }
}

/// Resolves the request's rows: JSON rows win over CSV text.
fn request_rows(rows: Option<Vec<DataRow>>, csv: Option<String>) -> Result<Vec<DataRow>, String> {
    match (rows, csv) {
        (Some(rows), _) => Ok(rows),
        (None, Some(text)) => rows_from_csv(&text).map_err(|e| e.to_string()),
        (None, None) => Err("request must contain either rows or csv".to_string()),
    }
}

async fn schedule_batch_job(
    state: web::Data<JobsState>,
    ctx: web::Data<BatchContext>,
    req: StartBatchRequest,
) -> Result<String, String> {
    req.template.validate()?;
    let rows = request_rows(req.rows, req.csv)?;
    let settings = ctx.job_settings(&req.options);

    let job_id = Uuid::new_v4().to_string();
    let cancel = state.register(&job_id).await;
    info!("batch {} scheduled with {} rows", job_id, rows.len());

    let state = state.get_ref().clone();
    let ctx = ctx.get_ref().clone();
    let job = tokio::spawn(run_batch_job(
        state.clone(),
        ctx,
        job_id.clone(),
        req.template,
        rows,
        settings,
        cancel,
    ));
    tokio::spawn(supervise_batch_job(state, job_id.clone(), job));

    Ok(job_id)
}

/// Waits for a spawned job and fails it if its task panicked or was aborted.
pub async fn supervise_batch_job(state: JobsState, job_id: String, job: JoinHandle<()>) {
    let Err(e) = job.await else {
        return;
    };
    error!("batch {} stopped abnormally: {}", job_id, e);
    if state.results.read().await.get(&job_id).is_some() {
        return;
    }
    let message = if e.is_panic() {
        "batch job panicked"
    } else {
        "batch job was aborted"
    };
    publish(&state, job_id, JobResult::failed(message.to_string())).await;
}

/// Runs one job to completion and publishes its result.
pub async fn run_batch_job(
    state: JobsState,
    ctx: BatchContext,
    job_id: String,
    template: Template,
    rows: Vec<DataRow>,
    settings: JobSettings,
    cancel: Arc<AtomicBool>,
) {
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<BatchUpdate>();

    // Translates `BatchUpdate`s into `JobUpdate`s for the central job controller.
    let job_updater_tx = state.tx.clone();
    let listener_state = state.clone();
    let job_id_for_updater = job_id.clone();
    let listener = tokio::spawn(async move {
        let mut last = None;
        while let Some(update) = batch_rx.recv().await {
            let percent = match update {
                BatchUpdate::RowFailed { index, message } => {
                    listener_state
                        .record_row_error(
                            &job_id_for_updater,
                            RowError {
                                index: index as i64,
                                message,
                            },
                        )
                        .await;
                    continue;
                }
                progress => progress.percent(),
            };
            let Some(percent) = percent else {
                continue;
            };
            if last == Some(percent) {
                continue;
            }
            last = Some(percent);
            let _ = job_updater_tx
                .send(JobUpdate::new(
                    job_id_for_updater.clone(),
                    JobStatus::InProgress(percent),
                ))
                .await;
        }
    });

    let mut scheduler = ctx.scheduler(settings);
    let mut observer = ChannelObserver::new(batch_tx);
    let result = scheduler
        .run(&template, &rows, &mut observer, move || {
            cancel.load(Ordering::SeqCst)
        })
        .await;

    // closing the channel lets the listener drain and stop
    drop(observer);
    let _ = listener.await;

    publish(&state, job_id, result).await;
}

/// Stores the result, then sends the final status.
async fn publish(state: &JobsState, job_id: String, result: JobResult) {
    let status = final_status(&result);
    state
        .finish(
            &job_id,
            FinishedJob {
                summary: result.summary(&job_id),
                archive: result.archive.map(Arc::new),
            },
        )
        .await;
    let _ = state.tx.send(JobUpdate::new(job_id, status)).await;
}

fn final_status(result: &JobResult) -> JobStatus {
    let message = format!(
        "{} generated, {} failed",
        result.total_generated,
        result.errors.len()
    );
    match result.state {
        BatchState::Cancelled => JobStatus::Cancelled(message),
        BatchState::Failed => JobStatus::Failed(
            result
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or(message),
        ),
        _ => JobStatus::Completed(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_splits_rows_and_archive() {
        assert_eq!(BatchUpdate::Row { current: 0, total: 4 }.percent(), Some(0));
        assert_eq!(BatchUpdate::Row { current: 2, total: 4 }.percent(), Some(45));
        assert_eq!(BatchUpdate::Row { current: 4, total: 4 }.percent(), Some(90));
        assert_eq!(BatchUpdate::Row { current: 0, total: 0 }.percent(), Some(90));
        assert_eq!(BatchUpdate::Archive(50.0).percent(), Some(95));
        assert_eq!(BatchUpdate::Archive(100.0).percent(), Some(100));
        let failed = BatchUpdate::RowFailed { index: 1, message: "bad".into() };
        assert_eq!(failed.percent(), None);
    }

    #[test]
    fn row_errors_are_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut observer = ChannelObserver::new(tx);
        observer.on_error(2, "missing image");
        assert_eq!(
            rx.try_recv().unwrap(),
            BatchUpdate::RowFailed {
                index: 2,
                message: "missing image".into()
            }
        );
    }

    #[tokio::test]
    async fn panicking_job_is_marked_failed() {
        let (state, mut rx) = JobsState::new(8, 4);
        let cancel = state.register("job").await;
        let job = tokio::spawn(async {
            panic!("rasterizer blew up");
        });

        supervise_batch_job(state.clone(), "job".to_string(), job).await;

        let update = rx.recv().await.unwrap();
        assert_eq!(update.job_id, "job");
        assert!(matches!(update.status, JobStatus::Failed(ref m) if m.contains("panicked")));

        let results = state.results.read().await;
        let summary = &results.get("job").unwrap().summary;
        assert_eq!(summary.state, BatchState::Failed);
        assert_eq!(summary.errors[0].index, -1);
        assert!(!state.request_cancel("job").await);
        assert!(!cancel.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn finished_job_is_left_alone() {
        let (state, mut rx) = JobsState::new(8, 4);
        state.register("job").await;
        let job = tokio::spawn(async {});

        supervise_batch_job(state.clone(), "job".to_string(), job).await;

        assert!(rx.try_recv().is_err());
        assert!(state.results.read().await.get("job").is_none());
    }

    #[test]
    fn rows_take_precedence_over_csv() {
        let rows = request_rows(
            Some(vec![DataRow::new().with("name", "Ada")]),
            Some("name\nGrace\n".into()),
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name").map(|v| v.to_string()).as_deref(), Some("Ada"));

        let rows = request_rows(None, Some("name\nGrace\nLinus\n".into())).unwrap();
        assert_eq!(rows.len(), 2);

        assert!(request_rows(None, None).is_err());
    }
}
