use crate::cli::{
    actions::{play, server, Action},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action, flushing traces once it is done.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Server(args) => server::execute(args).await,
        Action::Play(args) => play::execute(args).await,
    };

    telemetry::shutdown_tracer();

    result
}
