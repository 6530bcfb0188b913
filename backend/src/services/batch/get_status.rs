use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};

pub(crate) async fn process(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    get_batch_job_status(job_id, state).await
}

async fn get_batch_job_status(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    let jobs = state.jobs.read().await;
    if let Some(status) = jobs.get(&job_id.into_inner()) {
        HttpResponse::Ok().json(status)
    } else {
        HttpResponse::NotFound().body("Job ID not found")
    }
}

/// `GET /api/batch/errors/{job_id}`
///
/// Row failures reported so far, available while the job is still running.
pub(crate) async fn errors(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    let row_errors = state.row_errors.read().await;
    match row_errors.get(job_id.as_str()) {
        Some(errors) => HttpResponse::Ok().json(errors),
        None => HttpResponse::NotFound().body("Job ID not found"),
    }
}
