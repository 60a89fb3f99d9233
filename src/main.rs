use anyhow::{Context, Result};
use clap::Parser;

use marklive::Settings;
use marklive::cli::commands::{config, view, watch};
use marklive::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {e}");
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(run(cli));
    // The stdin reader may be parked in a blocking read that cannot be
    // cancelled; do not wait for it.
    runtime.shutdown_background();

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("cannot load configuration")?;
    marklive::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::View {
            file,
            debounce_ms,
            content_ready_timeout_ms,
        } => {
            let settings = settings.with_overrides(debounce_ms, content_ready_timeout_ms);
            settings.validate()?;
            marklive::debug_event!("cli", "settings", "{:?}", settings.timing());
            view::run(view::ViewArgs { file }, &settings).await
        }
        Commands::Watch { file, debounce_ms } => {
            let settings = settings.with_overrides(debounce_ms, None);
            settings.validate()?;
            watch::run(watch::WatchArgs { file }, &settings).await
        }
        Commands::Config => config::run(&settings),
    }
}
