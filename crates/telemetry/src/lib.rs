//! Logging and tracing bootstrap.

use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the event filter, letting `RUST_LOG` override the configured directive.
pub fn env_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.filter).map_err(|e| {
            anyhow::anyhow!("invalid telemetry filter '{}': {}", settings.filter, e)
        }),
    }
}

/// Install the global tracing subscriber.
///
/// A subscriber installed earlier (e.g. by a test harness) is left in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = env_filter(settings)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match settings.log_format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init(),
    };

    match installed {
        Ok(()) => tracing::info!(
            target: "shelf-telemetry",
            format = ?settings.log_format,
            filter = %settings.filter,
            "telemetry initialized"
        ),
        Err(_) => tracing::debug!(
            target: "shelf-telemetry",
            "global subscriber already installed; keeping it"
        ),
    }

    Ok(())
}
