use std::process::ExitCode;
use std::sync::Arc;

use nime_config::ConfigError;
use nimed::{
    BootstrapError, StructuredHealthReporter, SystemConfigLoader, SystemShutdownSignal,
    acknowledge_registry, bootstrap_with,
};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let daemon = match bootstrap_with(&SystemConfigLoader, reporter) {
        Ok(daemon) => daemon,
        Err(BootstrapError::Configuration {
            source: ConfigError::Parse(error),
        }) => error.exit(),
        Err(error) => return fail(&error),
    };

    let registry = acknowledge_registry(daemon.config().services().iter().cloned());
    match daemon.serve(Arc::new(registry), &SystemShutdownSignal) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => fail(&error),
    }
}

fn fail(error: &BootstrapError) -> ExitCode {
    eprintln!("nimed: {error}");
    ExitCode::FAILURE
}
