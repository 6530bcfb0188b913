//! CSV data source.
//!
//! - `POST /api/data_sources/csv/parse`: parses the CSV text in the body and
//!   returns the typed rows, so a client can check its data before starting
//!   a batch. `POST /api/batch/start` accepts the same text in its `csv` field.

use actix_web::web::{post, scope};
use actix_web::Scope;

pub mod parse;

pub use parse::rows_from_csv;

const API_PATH: &str = "/api/data_sources/csv";

/// Configures and returns the Actix scope for CSV data source routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("/parse", post().to(parse::process))
}
