//! Repository traits for metadata operations.

pub mod counters;
pub mod visits;

pub use counters::CounterRepo;
pub use visits::VisitRepo;
