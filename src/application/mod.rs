//! Application layer: Use cases and services.
//!
//! Services compose the ports with the shared [`QueryCache`]. Reads go
//! through the cache; writes invalidate the resource types they touch.

mod cache;
mod evaluation;
mod predictions;
mod records;
mod simulation;
mod training;

pub use cache::{CacheConfig, Lookup, QueryCache, QueryKey, Resource};
pub use evaluation::EvaluationService;
pub use predictions::{PredictionService, RiskAssessment};
pub use records::{DashboardSummary, PatientService};
pub use simulation::{
    SimulationConfig, SimulationHandle, SimulationOutcome, SimulationParams, SimulationWorker,
};
pub use training::TrainingService;
