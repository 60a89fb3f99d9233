//! Watch command - print debounced watch events.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::Settings;
use crate::host;
use crate::watcher::WatchEvent;

/// Arguments for the watch command.
pub struct WatchArgs {
    pub file: PathBuf,
}

/// Run the watch command.
pub async fn run(args: WatchArgs, settings: &Settings) -> Result<()> {
    let path = std::path::absolute(&args.file)?;
    host::watch_events(&path, settings.timing(), super::ctrl_c(), |event| {
        println!("{}", describe(event));
    })
    .await;
    Ok(())
}

fn describe(event: &WatchEvent) -> String {
    match event {
        WatchEvent::Ready(path)
        | WatchEvent::Changed(path)
        | WatchEvent::Created(path)
        | WatchEvent::Removed(path) => format!("{:<8} {}", event.name(), path.display()),
        WatchEvent::Error(e) => format!("{:<8} {e}", event.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::WatchError;

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&WatchEvent::Changed(PathBuf::from("/a.md"))),
            "changed  /a.md"
        );
        let error = WatchEvent::Error(WatchError::EventError {
            details: "overflow".to_string(),
        });
        assert_eq!(describe(&error), "error    File system event error: overflow");
    }
}
