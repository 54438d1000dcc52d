use std::process::ExitCode;

use clap::Parser;
use console::style;

use crate::cli::app::App;
use crate::cli::Verdict;

mod cli;
mod logging;
mod ui;

fn main() -> ExitCode {
    let app = App::parse();
    logging::init(app.verbose);

    match cli::run(app) {
        Ok(Verdict::Success) => ExitCode::SUCCESS,
        Ok(Verdict::NotAuthentic) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::from(2)
        }
    }
}
