use std::process::ExitCode;

use tracing::error;

mod bootstrap;
mod cli;
mod demo;
mod loop_runner;
mod report;

use bootstrap::BootstrapError;

pub(crate) fn run(args: &[String]) -> ExitCode {
    let app = match bootstrap::build_app(args) {
        Ok(Some(app)) => app,
        Ok(None) => return ExitCode::SUCCESS,
        Err(BootstrapError::Usage(message)) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    loop_runner::run(app)
}
