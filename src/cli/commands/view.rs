//! View command - serve a document to a display process over stdio.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::document::{FileDocumentSource, PreformattedRenderer};
use crate::host::{self, Host};
use crate::surface::ChannelSurface;

/// Arguments for the view command.
pub struct ViewArgs {
    pub file: PathBuf,
}

/// Run the view command.
pub async fn run(args: ViewArgs, settings: &Settings) -> Result<()> {
    let path = host::resolve_document_path(&args.file)
        .with_context(|| format!("cannot open {}", args.file.display()))?;

    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = host::spawn_stdout_writer(out_rx);
    let inbound = host::spawn_stdin_reader();

    let host = Host::new(
        ChannelSurface::new(out_tx),
        FileDocumentSource::new(PreformattedRenderer),
        settings.timing(),
    );
    host.run(&path, inbound, super::ctrl_c()).await;

    // The surface's sender went away with the host; let pending lines flush.
    writer.await.context("stdout writer failed")?;
    Ok(())
}
