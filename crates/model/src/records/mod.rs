pub mod kind;
pub mod results;
pub mod stats;
