//! # Cardiolens
//!
//! Client core of a cardiovascular risk dashboard.
//!
//! This crate provides:
//! - A typed gateway to the prediction backend's REST API
//! - Derivation helpers from raw measurements to model feature codes
//! - Dashboard aggregates and comparison view models
//! - Cached services and a debounced what-if simulator
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Wire types and pure computations
//! - `ports`: Trait definitions for backend operations
//! - `adapters`: Concrete implementations (reqwest gateway, log sanitizer)
//! - `application`: Services orchestrating domain and ports
//! - `telemetry`: Tracing subscriber setup

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;
pub mod telemetry;

pub use domain::{Patient, RiskLevel};
pub use ports::GatewayError;

/// Result type for Cardiolens operations
pub type Result<T> = std::result::Result<T, CardiolensError>;

/// Main error type for Cardiolens
#[derive(Debug, thiserror::Error)]
pub enum CardiolensError {
    #[error("Backend request failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Simulation worker stopped")]
    WorkerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<domain::ShapeDrift> for CardiolensError {
    fn from(drift: domain::ShapeDrift) -> Self {
        Self::Gateway(GatewayError::from(drift))
    }
}
