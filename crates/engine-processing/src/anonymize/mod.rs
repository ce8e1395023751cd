//! Field-level anonymization: a name-based classifier decides what a field holds,
//! a generator produces a synthetic replacement of the same shape, and the
//! [`Anonymizer`] walks whole records applying both.

pub mod classifier;
pub mod generator;
pub mod visitor;

pub use classifier::{Classification, FieldClassifier, FieldKind};
pub use generator::ValueGenerator;
pub use visitor::Anonymizer;
