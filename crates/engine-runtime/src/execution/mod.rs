pub mod extract;
pub mod factory;
pub mod mirror;
pub mod orchestrator;
