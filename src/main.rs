use clap::Parser;
use ninetrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
