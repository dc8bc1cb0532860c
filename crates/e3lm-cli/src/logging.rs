//! Log setup for the CLI.
//!
//! `RUST_LOG` wins when set; otherwise the `-v` count picks the level for
//! the lexer targets. Logs go to stderr so token output stays clean.

use std::io;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn init(verbosity: u8) {
    let layer = fmt::layer()
        .compact()
        .with_target(true)
        .without_time()
        .with_writer(io::stderr);

    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        tracing_subscriber::registry()
            .with(layer.with_filter(EnvFilter::from_default_env()))
            .init();
        return;
    }

    let level = level_for(verbosity);
    let targets = Targets::new()
        .with_default(LevelFilter::WARN)
        .with_target("e3lm::preprocess", level)
        .with_target("e3lm::lexer", level)
        .with_target("e3lm::cli", level);

    tracing_subscriber::registry()
        .with(layer.with_filter(targets))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), LevelFilter::WARN);
        assert_eq!(level_for(2), LevelFilter::DEBUG);
        assert_eq!(level_for(9), LevelFilter::TRACE);
    }
}
