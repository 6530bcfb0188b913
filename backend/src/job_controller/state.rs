//! Manages the state of long-running, asynchronous batch jobs.
//!
//! Batches run outside the request/response cycle. Handlers register a job,
//! spawn it, and return the job ID; clients then poll its status and fetch the
//! result once it has finished.
//!
//! The main components are:
//! - `JobsState`: A clonable, thread-safe struct shared as `web::Data`. It holds
//!   the status of every job, the row errors reported so far, the results of
//!   finished jobs and the cancellation flags of running ones. Only the most
//!   recent `retain` finished jobs are kept; older ones are forgotten entirely.
//! - `JobUpdate`: A message sent by a running job to report a status change.
//! - `start_job_updater`: A long-running task that applies `JobUpdate` messages
//!   to the status map.

use common::jobs::JobStatus;
use common::model::batch::JobSummary;
use common::model::record::RowError;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// What is kept once a batch job has ended.
#[derive(Debug, Clone)]
pub struct FinishedJob {
    pub summary: JobSummary,
    /// The zip archive, absent when the job failed.
    pub archive: Option<Arc<Vec<u8>>>,
}

/// Finished jobs in completion order, bounded to the newest `retain`.
#[derive(Debug)]
pub struct FinishedJobs {
    map: HashMap<String, FinishedJob>,
    order: VecDeque<String>,
    retain: usize,
}

impl FinishedJobs {
    pub fn new(retain: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            retain: retain.max(1),
        }
    }

    pub fn get(&self, job_id: &str) -> Option<&FinishedJob> {
        self.map.get(job_id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Stores `finished` and returns the IDs pushed out by it.
    fn insert(&mut self, job_id: &str, finished: FinishedJob) -> Vec<String> {
        if self.map.insert(job_id.to_string(), finished).is_none() {
            self.order.push_back(job_id.to_string());
        }
        let mut evicted = Vec::new();
        while self.order.len() > self.retain {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
                evicted.push(old);
            }
        }
        evicted
    }
}

/// A thread-safe, shareable container for the state of all background jobs.
#[derive(Clone)]
pub struct JobsState {
    /// Current `JobStatus` per job ID. Only `start_job_updater` writes to it
    /// after the job has been registered.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Results of finished jobs, written once by the job itself.
    pub results: Arc<RwLock<FinishedJobs>>,

    /// Row failures reported while a job runs, kept until the job is evicted.
    pub row_errors: Arc<RwLock<HashMap<String, Vec<RowError>>>>,

    /// Cancellation flags of jobs that have not finished yet.
    pub cancellations: Arc<RwLock<HashMap<String, Arc<AtomicBool>>>>,

    /// Sender side of the status channel consumed by `start_job_updater`.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    /// Creates the shared state and the receiver to hand to `start_job_updater`.
    ///
    /// At most `retain` finished jobs are remembered.
    pub fn new(buffer: usize, retain: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(buffer);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            results: Arc::new(RwLock::new(FinishedJobs::new(retain))),
            row_errors: Arc::new(RwLock::new(HashMap::new())),
            cancellations: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new job as `Pending` and returns its cancellation flag.
    pub async fn register(&self, job_id: &str) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.jobs
            .write()
            .await
            .insert(job_id.to_string(), JobStatus::Pending);
        self.cancellations
            .write()
            .await
            .insert(job_id.to_string(), flag.clone());
        self.row_errors
            .write()
            .await
            .insert(job_id.to_string(), Vec::new());
        flag
    }

    pub async fn record_row_error(&self, job_id: &str, error: RowError) {
        if let Some(errors) = self.row_errors.write().await.get_mut(job_id) {
            errors.push(error);
        }
    }

    /// Raises the cancellation flag of a running job.
    ///
    /// Returns `false` when the job is unknown or has already finished.
    pub async fn request_cancel(&self, job_id: &str) -> bool {
        match self.cancellations.read().await.get(job_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Stores the result of a finished job and drops its cancellation flag.
    ///
    /// Jobs pushed out of the retained window lose their status and row
    /// errors too.
    pub async fn finish(&self, job_id: &str, finished: FinishedJob) {
        self.cancellations.write().await.remove(job_id);
        let evicted = self.results.write().await.insert(job_id, finished);
        if evicted.is_empty() {
            return;
        }
        let mut jobs = self.jobs.write().await;
        let mut row_errors = self.row_errors.write().await;
        for old in evicted {
            debug!("forgetting finished job {}", old);
            jobs.remove(&old);
            row_errors.remove(&old);
        }
    }
}

/// Represents a status update for a specific background job.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
        }
    }
}

/// Starts the central job state updater task.
///
/// Spawned once from `main.rs`. It applies every `JobUpdate` received on `rx`
/// to the `jobs` map. A finished status is never overwritten by a late
/// progress update.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        let finished = jobs
            .get(&update.job_id)
            .map(JobStatus::is_finished)
            .unwrap_or(false);
        if !finished {
            jobs.insert(update.job_id, update.status);
        }
    }
}
