//! API module for the patient registry
//!
//! This module contains all HTTP-facing functionality.

pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use routes::configure;
