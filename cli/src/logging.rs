//! Log output on stderr.
//!
//! `RUST_LOG` takes precedence over everything else; `--verbose` selects
//! `debug`; otherwise the `[logging]` section of the config applies.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Install the global subscriber. Only the first call has an effect.
pub fn init(config: &LoggingConfig, verbose: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .without_time()
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = config.default.clone();
    for (module, level) in &config.modules {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_overrides_follow_the_default() {
        let mut config = LoggingConfig::default();
        config.modules.insert("lockorder".to_string(), "trace".to_string());
        config.modules.insert("tracer".to_string(), "debug".to_string());
        assert_eq!(filter_directives(&config), "warn,lockorder=trace,tracer=debug");
    }
}
