//! Log output for the `fidelity-engine` binary. Everything goes to stderr;
//! stdout carries only the rendered views and JSON.

use std::io::IsTerminal;

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "FIDELITY_LOG";

// sqlx logs every statement at info.
const DEPENDENCY_DIRECTIVES: &str = "sqlx=warn";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl Verbosity {
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    fn directives(self) -> String {
        match self {
            Self::Quiet => "error".to_string(),
            Self::Normal => format!("info,{DEPENDENCY_DIRECTIVES}"),
            Self::Verbose => format!(
                "warn,{DEPENDENCY_DIRECTIVES},literacy_fidelity_engine=debug,fidelity_engine=debug"
            ),
        }
    }
}

/// First override that parses wins; otherwise the flags decide.
fn select_filter(overrides: &[Option<String>], verbosity: Verbosity) -> EnvFilter {
    overrides
        .iter()
        .flatten()
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.directives()))
}

pub fn init_subscriber(verbosity: Verbosity) {
    let overrides = [
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    ];
    let filter = select_filter(&overrides, verbosity);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    if verbosity == Verbosity::Verbose {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_timer(fmt::time::uptime()).with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.without_time().with_target(false).compact())
            .init();
    }
}
