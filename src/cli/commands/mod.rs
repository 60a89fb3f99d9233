//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod config;
pub mod view;
pub mod watch;

/// Resolves when Ctrl-C is pressed.
pub(crate) async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[cli] cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}
