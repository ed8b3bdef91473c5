use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default directives when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "info,meto=debug";

/// Initialize JSON logging for the process.
/// - RUST_LOG respected; default to "info,meto=debug"
/// - Safe to call more than once; later calls keep the first subscriber
pub fn init(service_name: &str) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());

    let installed = tracing_subscriber::registry()
        .with(EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(service = %service_name, "Observability initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn init_twice_does_not_panic() {
        init("meto-test");
        init("meto-test");
    }
}
