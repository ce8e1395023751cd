pub mod document;
pub mod error;
pub mod file;
pub mod source;
pub mod sql;
pub mod storage;
