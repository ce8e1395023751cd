pub mod adapter;
pub mod source;
pub mod utils;
