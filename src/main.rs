use clap::Parser;
use stockdesk::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
