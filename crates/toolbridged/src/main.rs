use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use toolbridge_config::Settings;
use toolbridged::{StructuredHealthReporter, bootstrap_with};

fn main() -> ExitCode {
    let settings = Settings::parse();
    let reporter = Arc::new(StructuredHealthReporter::new());
    let bridge = match bootstrap_with(&settings, reporter) {
        Ok(bridge) => bridge,
        Err(error) => {
            // Telemetry may not be installed yet.
            eprintln!("toolbridged: {error}");
            return ExitCode::FAILURE;
        }
    };
    match bridge.serve_stdio() {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
