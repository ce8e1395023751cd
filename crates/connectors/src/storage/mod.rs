pub mod bucket;
pub mod error;
