//! Tracing setup.
//!
//! Native builds log through `tracing-subscriber`'s compact formatter with an
//! `EnvFilter` (`RUST_LOG`), browser builds through `tracing-wasm` to the
//! devtools console.
//!
//! # Usage
//!
//! ```ignore
//! use tessera_common::telemetry::{self, TelemetryConfig};
//!
//! telemetry::init(TelemetryConfig::from_env("tessera-carousel"));
//! tracing::info!("carousel ready");
//! ```

use tracing::Level;

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for labeling (e.g., "tessera-carousel")
    pub service_name: String,
    /// Console log level (default: INFO, DEBUG in debug builds)
    pub console_level: Level,
}

impl TelemetryConfig {
    /// Default level for the build profile. `RUST_LOG` still wins on native.
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        Self {
            service_name: service_name.into(),
            console_level,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn init(config: TelemetryConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.console_level.as_str().to_lowercase()));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(env_filter);

    if tracing_subscriber::registry()
        .with(console_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!(service = %config.service_name, "telemetry initialised");
    }
}

/// Install the global subscriber. Later calls are no-ops.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn init(config: TelemetryConfig) {
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(config.console_level)
            .build(),
    );

    let reg = Registry::default().with(wasm_layer);
    if tracing::subscriber::set_global_default(reg).is_ok() {
        tracing::debug!(service = %config.service_name, "telemetry initialised");
    }
}
