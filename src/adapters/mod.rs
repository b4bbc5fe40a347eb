//! Adapters layer: Concrete implementations of ports.
//!
//! - `http`: reqwest gateway to the prediction backend
//! - `sanitize`: PII filtering for logs

pub mod http;
pub mod sanitize;

pub use http::{GatewayConfig, HttpGateway};
