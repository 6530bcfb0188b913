use crate::model::batch::BatchOptions;
use crate::model::row::DataRow;
use crate::model::template::Template;
use serde::Deserialize;

/// Request payload for starting a batch job.
///
/// Rows come either as JSON objects in `rows` or as delimited text in `csv`.
/// When both are present, `rows` wins.
#[derive(Deserialize)]
pub struct StartBatchRequest {
    pub template: Template,
    #[serde(default)]
    pub rows: Option<Vec<DataRow>>,
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub options: BatchOptions,
}
