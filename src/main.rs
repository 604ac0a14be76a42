//! qpress binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match quarto_press::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        // The CLI has already printed the error.
        Err(_) => ExitCode::FAILURE,
    }
}
