//! Per-row document generation: template instantiation, rasterization,
//! composition, archiving and the scheduler that drives them.

pub mod archive;
pub mod code_mark;
pub mod compose;
pub mod error;
pub mod ids;
pub mod instantiate;
pub mod persist;
pub mod raster;
pub mod scene;
pub mod scheduler;
