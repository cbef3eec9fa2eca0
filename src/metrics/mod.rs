//! Prometheus metrics exporter for the capture screen.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `rubix_capture_session_binds_total` - Sessions bound
//! - `rubix_capture_session_generation` - Generation of the bound session
//! - `rubix_capture_active_facing` - Bound lens (0=none, 1=back, 2=front)
//! - `rubix_capture_provider_failures_total` - Failed provider acquisitions
//! - `rubix_capture_bind_failures_total` - Rejected binds
//!
//! ## Capture Metrics
//! - `rubix_capture_photos_saved_total` - Photos written
//! - `rubix_capture_failures_total{kind}` - Failed captures by kind
//!
//! ## Torch Metrics
//! - `rubix_capture_torch_toggles_total` - Torch state changes
//! - `rubix_capture_torch_unavailable_total` - Toggles without a flash unit
//!
//! # Example
//!
//! ```no_run
//! use rubix_capture::capture::LensFacing;
//! use rubix_capture::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.record_bind(1, LensFacing::Back);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
