use anyhow::Result;
use clap::Parser;

use dots::cli::{self, Command};
use dots::commands;
use dots::installer::CancelToken;
use dots::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let name = args.command.name();
    logging::init_subscriber(args.verbose, name);
    let log = Logger::new(name);

    let cancel = CancelToken::new();
    let handler = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        log.debug(&format!("interrupt handler unavailable: {e}"));
    }

    match &args.command {
        Command::Install(opts) => {
            commands::install::run(&args.global, opts, args.verbose, &log, &cancel)
        }
        Command::Files(opts) => commands::files::run(&args.global, opts, &log),
        Command::Diff(opts) => commands::diff::run(&args.global, opts, &log),
        Command::Config(opts) => commands::config::run(&args.global, opts, &log),
    }
}
