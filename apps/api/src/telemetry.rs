use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets logged at `default_level` when `RUST_LOG` is unset: the library,
/// the `smarthire` CLI binary and the HTTP trace layer.
const DEFAULT_TARGETS: [&str; 3] = [env!("CARGO_CRATE_NAME"), "smarthire", "tower_http"];

fn default_directive(default_level: &str) -> String {
    DEFAULT_TARGETS
        .iter()
        .map(|target| format!("{target}={default_level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(default_level))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
