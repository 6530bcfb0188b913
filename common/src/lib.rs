//! Data model shared between the batch pipeline, the HTTP service and any
//! caller that submits templates and rows.

pub mod jobs;
pub mod model;
pub mod requests;
