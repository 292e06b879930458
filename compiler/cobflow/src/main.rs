//! The executable rendering COBOL procedure divisions as structured flowchart
//! outlines.

use std::process::ExitCode;

use clap::Parser;
use cobflow_driver::Arguments;

fn main() -> ExitCode {
    let arguments = Arguments::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(arguments.log_filter()),
    )
    .init();

    cobflow_driver::run(arguments)
}
