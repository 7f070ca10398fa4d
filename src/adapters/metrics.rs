//! Prometheus metrics recorder and metric names.
//!
//! Metrics go through the `metrics` facade. Without an installed recorder
//! (unit tests) every macro call is a no-op.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Active WebSocket connections that completed the handshake (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Handshakes that failed (counter, labels: reason).
pub const WS_HANDSHAKE_FAILURES_TOTAL: &str = "ws_handshake_failures_total";
/// Inbound messages routed by the room manager (counter, labels: mode).
pub const WS_MESSAGES_ROUTED_TOTAL: &str = "ws_messages_routed_total";
/// Per-recipient sends that failed or timed out (counter).
pub const WS_DELIVERY_FAILURES_TOTAL: &str = "ws_delivery_failures_total";

/// Install the Prometheus recorder as the global metrics recorder.
///
/// Returns the handle used to render the `/metrics` endpoint. Fails if a
/// recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Build a recorder without installing it globally (tests, embedding).
pub fn standalone_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
