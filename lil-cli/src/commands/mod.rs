use crate::cli::Commands;
use anyhow::Result;

pub mod child;
pub mod run;

/// Dispatch command to appropriate handler
///
/// Returns the exit code the process should terminate with.
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Child(args) => child::execute(args).await,
    }
}
