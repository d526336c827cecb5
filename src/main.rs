//! `homelink` command-line binary entry point.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use homelink_cli::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let command = args.command.unwrap_or(cli::Command::Link);

    match command {
        cli::Command::Link => {
            logging::init_subscriber(args.verbose, "link");
            let log = logging::Logger::new("link");

            // Interrupts only take effect between file operations, so a
            // backup copy is never abandoned half-done.
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&cancel);
            ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

            commands::link::run(&args.global, &log, &cancel)
        }
        cli::Command::Version => {
            let version = option_env!("HOMELINK_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("homelink {version}");
            Ok(())
        }
    }
}
