pub mod adapter;
pub mod convert;
pub mod source;

pub use mongodb::bson::Document;
