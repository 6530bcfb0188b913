//! `GET /verify/{id}`: the target of every code mark and verification link.
//!
//! Answers with the stored [`DocumentRecord`](common::model::record::DocumentRecord)
//! for a generation ID, or `404` when nothing was issued under it.

use crate::pipeline::persist::SqliteRecordStore;
use crate::services::batch::BatchContext;
use actix_web::web::{get, scope};
use actix_web::{web, HttpResponse, Responder, Scope};
use log::warn;

pub fn configure_routes() -> Scope {
    scope("/verify").route("/{id}", get().to(process))
}

pub(crate) async fn process(id: web::Path<String>, ctx: web::Data<BatchContext>) -> impl Responder {
    let id = id.into_inner();
    let store = SqliteRecordStore::new(&ctx.config.database_path);
    match store.find(id.trim()) {
        Ok(Some(record)) => HttpResponse::Ok().json(record),
        Ok(None) => HttpResponse::NotFound().body("No document was issued with this ID"),
        Err(e) => {
            warn!("lookup of {} failed: {}", id, e);
            HttpResponse::InternalServerError().body("Record store unavailable")
        }
    }
}
