//! Runs a vaccine efficacy sweep and writes its event records.
//!
//! ```text
//! vaxsim [OPTIONS] <MODEL> [PARAMS]
//! ```
//!
//! See `vaxsim --help` for the options.

use std::process::ExitCode;

use clap::Parser;
use vaxsim::log::{error, set_log_level};
use vaxsim::runner::{run_with_args, BaseArgs};

fn main() -> ExitCode {
    let args = BaseArgs::parse();
    set_log_level(args.log_level);

    match run_with_args(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
