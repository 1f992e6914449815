//! Configuration-driven alignment runs.
//!
//! A run loads every configured dataset, applies transformations, aligns
//! the datasets in time and then in space against a reference, and scores
//! the aligned datasets.

pub mod config;
pub mod runner;
pub mod save;
pub mod verification;

pub use config::RunConfig;
pub use runner::{RunReport, Runner};
pub use verification::{MetricRegistry, Scores};
