pub mod error;
pub mod observer;
pub mod retry;
pub mod watermark;
