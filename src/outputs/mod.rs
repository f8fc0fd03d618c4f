//! Run output.
//!
//! # Submodules
//!
//! - [`json`]: writes the [`RunReport`](crate::models::RunReport) of a run,
//!   including dry runs, for later inspection

pub mod json;
