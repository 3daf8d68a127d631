//! Logging configuration and initialization

use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing on stderr. `RUST_LOG` wins over the `-v` count.
pub fn init_logging(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));

    let initialized = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .try_init();

    if initialized.is_ok() {
        debug!("dupwrap started with verbosity level: {}", verbose);
        trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "info");
        assert_eq!(log_level(2), "debug");
        assert_eq!(log_level(7), "trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(0);
        init_logging(3);
    }
}
