pub mod anonymize;
pub mod error;
pub mod load;
pub mod schema;
pub mod transform;
