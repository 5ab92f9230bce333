use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use seg_batch::{logger, run, Config, OnnxEngine, RunSummary};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FATAL: u8 = 1;
const EXIT_PARTIAL_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let config = Config::parse();
    logger::setup_logging(config.verbose);

    let result = process(&config);
    if let Err(e) = &result {
        error!("{e:#}");
    }
    ExitCode::from(exit_code(&result))
}

fn process(config: &Config) -> Result<RunSummary> {
    let spec = config.engine_spec();
    run(
        &config.input_dir,
        &config.output_dir,
        config.run_options(),
        || OnnxEngine::new(&spec),
    )
    .with_context(|| format!("Failed to process {}", config.input_dir.display()))
}

/// 0 for a clean run, 1 for a fatal error, 2 when some files failed.
fn exit_code(result: &Result<RunSummary>) -> u8 {
    match result {
        Ok(summary) if summary.has_failures() => EXIT_PARTIAL_FAILURE,
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_FATAL,
    }
}
