pub mod batch;
pub mod record;
pub mod row;
pub mod template;
