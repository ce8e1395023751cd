pub mod events;
pub mod records;
pub mod schema;
pub mod summary;
