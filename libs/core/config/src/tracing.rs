use crate::Environment;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install the color-eyre report handler.
///
/// Call first thing in `main()`. Reports show the error location but never
/// the environment, which holds the admin URI and the user password.
/// Repeated calls are no-ops.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Filter used when `RUST_LOG` is not set. The driver stays at `warn`.
fn default_filter(environment: &Environment) -> EnvFilter {
    if environment.is_production() {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("info,mongodb=warn")
    }
}

/// Initialize tracing with environment-aware configuration and error span capture.
///
/// - **Production** (`APP_ENV=production`):
///   - JSON format (for log aggregation)
///   - Hides module targets
///
/// - **Development** (default):
///   - Compact human-readable format
///
/// Both write to stderr so the final report on stdout stays machine-readable
/// when `--json` is used. `RUST_LOG` overrides the default filter.
///
/// Safe to call multiple times: a second initialization is ignored
/// (common in tests).
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(environment));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    if result.is_ok() {
        info!(environment = ?environment, "Tracing initialized");
    } else {
        debug!("Tracing already initialized");
    }
}
