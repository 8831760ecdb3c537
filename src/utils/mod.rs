//! Utility modules for eav_store

pub mod datetime;

pub use datetime::{EavDateTime, chrono};
