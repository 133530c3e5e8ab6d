//! tsk - personal task tracker

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = tsk::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
