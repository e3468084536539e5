//! Subcommand handlers.

pub mod audit;
pub mod catalog;
pub mod prompt;
pub mod providers;
pub mod sessions;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancel `token` on Ctrl-C. Abort the handle once the guarded work ends.
pub fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling provider call");
            token.cancel();
        }
    })
}
