//! API module - REST handlers and the upload page

pub mod rest;
pub mod dto;
pub mod page;

pub use rest::{create_rest_router, AppState};
