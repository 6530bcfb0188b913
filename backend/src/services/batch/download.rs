use crate::job_controller::state::JobsState;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Responder};

/// `GET /api/batch/result/{job_id}`
pub(crate) async fn result(job_id: web::Path<String>, state: web::Data<JobsState>) -> impl Responder {
    let results = state.results.read().await;
    match results.get(job_id.as_str()) {
        Some(finished) => HttpResponse::Ok().json(&finished.summary),
        None => HttpResponse::NotFound().body("Job result not available"),
    }
}

/// `GET /api/batch/archive/{job_id}`
///
/// The archive is tagged with the MD5 of its bytes; a matching
/// `If-None-Match` gets `304 Not Modified`.
pub(crate) async fn archive(
    req: HttpRequest,
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    let job_id = job_id.into_inner();
    let archive = {
        let results = state.results.read().await;
        results.get(&job_id).and_then(|f| f.archive.clone())
    };
    let Some(archive) = archive else {
        return HttpResponse::NotFound().body("Archive not available");
    };

    let etag = format!("\"{:x}\"", md5::compute(archive.as_slice()));
    let cached = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == etag)
        .unwrap_or(false);
    if cached {
        return HttpResponse::NotModified()
            .insert_header((header::ETAG, etag))
            .finish();
    }

    HttpResponse::Ok()
        .content_type("application/zip")
        .insert_header((header::ETAG, etag))
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"batch_{}.zip\"", job_id),
        ))
        .body(archive.as_ref().clone())
}
