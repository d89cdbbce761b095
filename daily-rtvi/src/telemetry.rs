//! Console logging setup.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Install a console `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Only the first call has an effect, and it does
/// nothing if the application already installed a global subscriber.
///
/// # Example
/// ```
/// daily_rtvi::telemetry::init_tracing();
/// tracing::info!("transport starting");
/// ```
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
            .try_init();

        if installed.is_ok() {
            tracing::debug!("tracing initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
