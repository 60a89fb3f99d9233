//! Config command - show the effective settings.

use anyhow::Result;

use crate::config::Settings;

/// Run the config command.
pub fn run(settings: &Settings) -> Result<()> {
    if let Some(path) = Settings::default_config_path() {
        println!("# default config file: {}", path.display());
    }
    print!("{}", settings.to_toml()?);
    Ok(())
}
