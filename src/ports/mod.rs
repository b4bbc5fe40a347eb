//! Ports layer: Trait definitions for backend operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the application services and the prediction backend.

mod admin;
mod error;
mod patients;
mod predictions;
mod training;

pub use admin::AdminBackend;
pub use error::GatewayError;
pub use patients::PatientRepository;
pub use predictions::PredictionBackend;
pub use training::TrainingBackend;
