//! Service layer for the cafe-hop service
//!
//! This module contains the application state, the HTTP router and health
//! checks.

pub mod app;
pub mod health;
pub mod routes;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use routes::{create_router, ApiError};
