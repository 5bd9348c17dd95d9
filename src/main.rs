// src/main.rs

use intemp::engine::{exit_code_for_error, EXIT_INTERNAL};
use intemp::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("intemp error: {err:?}");
        std::process::exit(EXIT_INTERNAL);
    }

    match run(args).await {
        Ok(outcome) => {
            if !outcome.success() {
                eprintln!("intemp: {}", outcome.describe());
            }
            std::process::exit(outcome.exit_code());
        }
        Err(err) => {
            eprintln!("intemp error ({}): {err}", err.phase());
            std::process::exit(exit_code_for_error(&err));
        }
    }
}
