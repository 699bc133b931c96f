//! Service layer module

pub mod age_service;
pub mod types;

pub use age_service::{run_pipeline, AgeService};
pub use types::*;
