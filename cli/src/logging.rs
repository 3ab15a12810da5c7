use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "HBPF_LOG";

/// Initialize logging to stderr. Call once, at startup.
///
/// `HBPF_LOG` takes an `EnvFilter` directive such as `debug` or
/// `vm=trace`; without it only warnings are shown.
pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
