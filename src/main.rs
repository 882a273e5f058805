use clap::Parser;
use std::process::ExitCode;

use cliphist_lib::commands::{Cli, Exit};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Exit::for_parse_error(&e).into();
        }
    };

    cliphist_lib::setup_logging(cli.verbose);

    match cliphist_lib::run(cli).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            Exit::Failure.into()
        }
    }
}
