//! Batch generation API.
//!
//! The provided routes are:
//! - `POST /api/batch/start`: Validates the template, reads the rows (JSON or
//!   CSV text), registers a `Pending` job and spawns it. Returns the `job_id`.
//! - `GET /api/batch/status/{job_id}`: Current `JobStatus` of the job.
//! - `GET /api/batch/errors/{job_id}`: Row failures reported so far.
//! - `POST /api/batch/cancel/{job_id}`: Asks a running job to stop before its
//!   next row. Rows already generated are kept.
//! - `GET /api/batch/result/{job_id}`: The `JobSummary` of a finished job.
//! - `GET /api/batch/archive/{job_id}`: The zip archive of a finished job.

use crate::config::{AppConfig, RenderAssets};
use crate::pipeline::code_mark::CodeMarkGenerator;
use crate::pipeline::compose::DocumentComposer;
use crate::pipeline::instantiate::TemplateInstantiator;
use crate::pipeline::persist::SqliteRecordStore;
use crate::pipeline::raster::{multiplier_for_dpi, SkiaRasterizer};
use crate::pipeline::scheduler::{BatchScheduler, JobSettings};
use actix_web::web::{get, post, scope};
use actix_web::Scope;
use common::model::batch::BatchOptions;

mod cancel;
mod download;
mod get_status;
pub mod start;

const API_PATH: &str = "/api/batch";
const DEFAULT_TITLE: &str = "Certificate";

/// Configures and returns the Actix scope for batch routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/start", post().to(start::process))
        .route("/status/{job_id}", get().to(get_status::process))
        .route("/errors/{job_id}", get().to(get_status::errors))
        .route("/cancel/{job_id}", post().to(cancel::process))
        .route("/result/{job_id}", get().to(download::result))
        .route("/archive/{job_id}", get().to(download::archive))
}

/// Everything a job needs besides its own request, shared as `web::Data`.
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub config: AppConfig,
    pub assets: RenderAssets,
}

impl BatchContext {
    pub fn new(config: AppConfig, assets: RenderAssets) -> Self {
        Self { config, assets }
    }

    /// Service defaults overridden by whatever the request supplies.
    pub fn job_settings(&self, options: &BatchOptions) -> JobSettings {
        JobSettings {
            multiplier: multiplier_for_dpi(self.config.dpi),
            yield_every: options
                .yield_every
                .filter(|n| *n > 0)
                .unwrap_or(self.config.yield_every),
            output_mode: options.output_mode,
            recipient_column: options.recipient_column.clone(),
            title: options
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            issuer_label: options
                .issuer_label
                .clone()
                .unwrap_or_else(|| self.config.issuer_label.clone()),
        }
    }

    /// A scheduler wired to the built-in rasterizer and the SQLite store.
    pub fn scheduler(&self, settings: JobSettings) -> BatchScheduler<SkiaRasterizer, SqliteRecordStore> {
        let composer = DocumentComposer::new(self.config.page, settings.title.clone());
        BatchScheduler::new(
            TemplateInstantiator::new(
                self.config.verify_base_url.clone(),
                CodeMarkGenerator::default(),
            ),
            SkiaRasterizer::new(self.assets.font.clone()),
            composer,
            SqliteRecordStore::new(&self.config.database_path),
            settings,
        )
    }
}
