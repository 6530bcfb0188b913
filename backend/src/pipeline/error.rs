use thiserror::Error;

/// Errors raised by the stages of the document pipeline.
///
/// Inside the batch loop any of these aborts only the row being processed.
/// The same type is used for job-level failures that escape row isolation.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    #[error("invalid colour '{0}'")]
    InvalidColor(String),

    #[error("code mark generation failed: {0}")]
    CodeMark(String),

    #[error("raster error: {0}")]
    Raster(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("duplicate archive entry '{0}'")]
    DuplicateEntry(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("data source error: {0}")]
    DataSource(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
