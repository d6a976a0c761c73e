//! # gitsem CLI
//!
//! Command-line interface for the gitsem metadata layer.
//!
//! This binary exposes `gitsem-core` operations as non-interactive
//! subcommands. Run `gitsem --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
