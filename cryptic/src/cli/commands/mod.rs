//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod make;
pub mod preview;
pub mod serve;
pub mod version;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::error::CrypticError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `cancel` is fired by the signal handler; long-running commands shut
/// down when it does.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), CrypticError> {
    match cli.command {
        Commands::Serve(args) => serve::run(&args, cancel).await,
        Commands::Make(args) => make::run(&args),
        Commands::Preview(args) => preview::run(&args),
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
