use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs a stderr fmt subscriber. `RUST_LOG` takes precedence over
/// `default_directive` (e.g. `"ferry_runtime=info"`).
///
/// Returns false when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let initialized = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if initialized {
        tracing::debug!(
            target: "ferry_runtime::utils::tracing",
            default_directive,
            "Tracing initialized. Filter configured via RUST_LOG env var."
        );
    }
    initialized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_tracing("off");
        assert!(!init_tracing("off"));
    }
}
