use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;

/// Dependencies log at `warn`; this crate at `info`, or `debug` when verbose.
/// `RUST_LOG` directives are applied on top of these defaults.
pub fn setup_logging(verbose: bool) {
    let _ = default_filters(verbose)
        .parse_env(Env::default())
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            match record.level() {
                Level::Error | Level::Warn => writeln!(
                    buf,
                    "[{} {} {}] {}",
                    name,
                    record.level(),
                    record.target(),
                    record.args()
                ),
                _ => writeln!(buf, "[{}] {}", name, record.args()),
            }
        })
        .try_init();
}

fn default_filters(verbose: bool) -> Builder {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_CRATE_NAME"), level);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Log, Metadata};

    fn enabled(logger: &impl Log, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn test_default_levels() {
        let crate_name = env!("CARGO_CRATE_NAME");
        let quiet = default_filters(false).build();
        assert!(enabled(&quiet, crate_name, Level::Info));
        assert!(!enabled(&quiet, crate_name, Level::Debug));
        assert!(enabled(&quiet, "ort", Level::Warn));
        assert!(!enabled(&quiet, "ort", Level::Info));

        let verbose = default_filters(true).build();
        assert!(enabled(&verbose, crate_name, Level::Debug));
    }

    #[test]
    fn test_env_directives_override_defaults() {
        let crate_name = env!("CARGO_CRATE_NAME");
        let logger = default_filters(false)
            .parse_filters(&format!("{crate_name}=trace"))
            .build();
        assert!(enabled(&logger, crate_name, Level::Trace));

        let global = default_filters(false).parse_filters("debug").build();
        assert!(enabled(&global, "ort", Level::Debug));
    }
}
