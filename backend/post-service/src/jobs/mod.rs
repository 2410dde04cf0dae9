//! Background jobs for post-service

pub mod reference_sweeper;

pub use reference_sweeper::ReferenceSweepJob;
