//! Imagine API Library
//!
//! This crate provides the HTTP proxy that fetches images from the upstream
//! origin and runs them through the response relay, plus application setup.

mod handlers;
mod middleware;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
