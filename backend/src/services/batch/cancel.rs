use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};
use log::info;

/// Raises the job's cancellation flag. The job notices it before its next row.
pub(crate) async fn process(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    let job_id = job_id.into_inner();
    if state.request_cancel(&job_id).await {
        info!("cancellation requested for batch {}", job_id);
        HttpResponse::Accepted().json(serde_json::json!({ "job_id": job_id }))
    } else {
        HttpResponse::NotFound().body("Job ID not found or already finished")
    }
}
