//! Metrics collection and registry.

use crate::capture::LensFacing;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics registry for the capture screen.
pub struct MetricsRegistry {
    registry: Registry,

    // Session metrics
    session_binds: IntCounter,
    session_generation: IntGauge,
    active_facing: IntGauge,
    provider_failures: IntCounter,
    bind_failures: IntCounter,

    // Capture metrics
    photos_saved: IntCounter,
    capture_failures: IntCounterVec,

    // Torch metrics
    torch_toggles: IntCounter,
    torch_unavailable: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all capture metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_binds = IntCounter::new(
            "rubix_capture_session_binds_total",
            "Total number of capture sessions bound",
        )?;
        let session_generation = IntGauge::new(
            "rubix_capture_session_generation",
            "Generation number of the currently bound session",
        )?;
        let active_facing = IntGauge::new(
            "rubix_capture_active_facing",
            "Lens of the bound session (0=none, 1=back, 2=front)",
        )?;
        let provider_failures = IntCounter::new(
            "rubix_capture_provider_failures_total",
            "Camera provider acquisitions that failed",
        )?;
        let bind_failures = IntCounter::new(
            "rubix_capture_bind_failures_total",
            "Session binds rejected by the camera provider",
        )?;
        let photos_saved = IntCounter::new(
            "rubix_capture_photos_saved_total",
            "Photos written to the media store",
        )?;
        let capture_failures = IntCounterVec::new(
            Opts::new(
                "rubix_capture_failures_total",
                "Capture attempts that failed, by failure kind",
            ),
            &["kind"],
        )?;
        let torch_toggles = IntCounter::new(
            "rubix_capture_torch_toggles_total",
            "Torch state changes requested by the user",
        )?;
        let torch_unavailable = IntCounter::new(
            "rubix_capture_torch_unavailable_total",
            "Torch toggles on a camera without a flash unit",
        )?;

        registry.register(Box::new(session_binds.clone()))?;
        registry.register(Box::new(session_generation.clone()))?;
        registry.register(Box::new(active_facing.clone()))?;
        registry.register(Box::new(provider_failures.clone()))?;
        registry.register(Box::new(bind_failures.clone()))?;
        registry.register(Box::new(photos_saved.clone()))?;
        registry.register(Box::new(capture_failures.clone()))?;
        registry.register(Box::new(torch_toggles.clone()))?;
        registry.register(Box::new(torch_unavailable.clone()))?;

        Ok(Self {
            registry,
            session_binds,
            session_generation,
            active_facing,
            provider_failures,
            bind_failures,
            photos_saved,
            capture_failures,
            torch_toggles,
            torch_unavailable,
        })
    }

    /// Records a successful bind.
    pub fn record_bind(&self, generation: u64, facing: LensFacing) {
        self.session_binds.inc();
        self.session_generation.set(generation as i64);
        self.active_facing.set(match facing {
            LensFacing::Back => 1,
            LensFacing::Front => 2,
        });
    }

    /// Records that no session is bound any more.
    pub fn record_unbound(&self) {
        self.active_facing.set(0);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.inc();
    }

    pub fn record_bind_failure(&self) {
        self.bind_failures.inc();
    }

    pub fn record_photo_saved(&self) {
        self.photos_saved.inc();
    }

    /// Records a failed capture under its failure kind.
    pub fn record_capture_failure(&self, kind: &str) {
        self.capture_failures.with_label_values(&[kind]).inc();
    }

    pub fn record_torch_toggle(&self) {
        self.torch_toggles.inc();
    }

    pub fn record_torch_unavailable(&self) {
        self.torch_unavailable.inc();
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("session_binds", &self.session_binds.get())
            .field("photos_saved", &self.photos_saved.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_session_metrics() {
        let registry = MetricsRegistry::new().unwrap();

        registry.record_bind(1, LensFacing::Back);
        registry.record_bind(2, LensFacing::Front);

        let output = registry.encode().unwrap();
        assert!(output.contains("rubix_capture_session_binds_total 2"));
        assert!(output.contains("rubix_capture_session_generation 2"));
        assert!(output.contains("rubix_capture_active_facing 2"));

        registry.record_unbound();
        let output = registry.encode().unwrap();
        assert!(output.contains("rubix_capture_active_facing 0"));
    }

    #[test]
    fn test_capture_failures_by_kind() {
        let registry = MetricsRegistry::new().unwrap();

        registry.record_capture_failure("encode");
        registry.record_capture_failure("encode");
        registry.record_capture_failure("stream_open");

        let output = registry.encode().unwrap();
        assert!(output.contains("rubix_capture_failures_total{kind=\"encode\"} 2"));
        assert!(output.contains("rubix_capture_failures_total{kind=\"stream_open\"} 1"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("rubix_capture_session_binds_total"));
        assert!(output.contains("rubix_capture_photos_saved_total"));
        assert!(output.contains("rubix_capture_torch_toggles_total"));
    }
}
