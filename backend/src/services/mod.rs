pub mod batch;
pub mod data_sources;
pub mod verify;
