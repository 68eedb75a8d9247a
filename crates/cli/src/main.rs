use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Book catalogue service")]
struct Cli {
    /// Environment overlay to load (local, staging, production)
    #[arg(long, global = true, env = "SHELF_ENV")]
    env: Option<String>,

    /// Directory holding base.toml and the environment overlays
    #[arg(long, global = true, env = "SHELF_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations, then serve the HTTP API until interrupted
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Print the resolved settings as JSON
    Config,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        if self.env.is_none() && self.config_dir.is_none() {
            return Settings::load();
        }

        let _ = dotenvy::dotenv();
        let environment = self.env.as_deref().unwrap_or("local");
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        Settings::load_from(&config_dir, environment)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings().context("failed to load shelf settings")?;

    match cli.command {
        Command::Serve => {
            shelf_telemetry::init(&settings.telemetry)?;
            shelf_app::bootstrap::run(&settings).await
        }
        Command::Migrate => {
            shelf_telemetry::init(&settings.telemetry)?;
            let applied = shelf_app::bootstrap::migrate_only(&settings).await?;
            tracing::info!(applied, "migrations applied");
            println!("applied {applied} migration(s)");
            Ok(())
        }
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
    }
}
