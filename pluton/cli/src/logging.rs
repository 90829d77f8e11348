use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logs go to stderr, stdout is left to the command's output. Filtered with `RUST_LOG`.
pub(crate) fn init_tracing_registry(json_log: bool) {
    if json_log {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .with(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_line_number(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}
