//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`validate`]. Without a subcommand the
//! top-level options are handed to [`run`], so a bare `portico` serves the
//! current directory on `:8000`.

pub mod run;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::PorticoError;

pub async fn dispatch(cli: Cli) -> Result<(), PorticoError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        None => run::execute(cli.run).await,
    }
}
