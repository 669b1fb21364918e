use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dynamo_launcher::config::{ConfigManager, CONFIG_FILE_NAME};
use dynamo_launcher::platform::absolutize;
use dynamo_launcher::{ConsoleProgress, Error, Launcher};

#[derive(Parser)]
#[command(name = "dynamo", author, version, about, long_about = None)]
struct Cli {
    /// Install root holding `versions/` and `libraries/`
    /// [default: platform data directory, e.g. ~/.DynamoLauncher]
    #[arg(long, global = true, verbatim_doc_comment)]
    root: Option<PathBuf>,

    /// Config file [default: <root>/launcher.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stable releases known to the version manifest
    Versions,

    /// List versions present in the install root
    Installed,

    /// Verify a version and play it
    Launch {
        /// Version id, e.g. 1.20.1
        version: String,

        /// Player name; a random one is generated when omitted
        #[arg(short, long, default_value = "")]
        username: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = cli
        .root
        .map(absolutize)
        .transpose()
        .context("Failed to resolve --root")?;

    let config_path = match (&cli.config, &root) {
        (Some(path), _) => path.clone(),
        (None, Some(root)) => root.join(CONFIG_FILE_NAME),
        (None, None) => ConfigManager::for_default_root().config_path().to_path_buf(),
    };

    let mut manager = ConfigManager::new(config_path);
    // Only launching may write the config and create the install root.
    let loaded = if matches!(cli.command, Commands::Launch { .. }) {
        manager.load()
    } else {
        manager.load_existing().map(|_| ())
    };
    loaded.context("Failed to load launcher config")?;
    if let Some(root) = root {
        manager.update(|c| c.install_root = root);
    }
    let config = manager.into_config();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str()))
        .init();

    config.validate()?;
    let launcher = Launcher::new(config);

    match cli.command {
        Commands::Versions => {
            for id in launcher.catalog().list_available().await? {
                println!("{}", id);
            }
            Ok(())
        }
        Commands::Installed => match launcher.catalog().list_downloaded().await {
            Ok(ids) => {
                for id in ids {
                    println!("{}", id);
                }
                Ok(())
            }
            Err(Error::NotFound(path)) => {
                anyhow::bail!(
                    "Versions folder not found at {}. Make sure DynamoLauncher is set up correctly.",
                    path.display()
                )
            }
            Err(e) => Err(e.into()),
        },
        Commands::Launch { version, username } => {
            let mut task = launcher.new_task();
            task.add_observer(Arc::new(ConsoleProgress::new()));

            let handle = task.start(&version, &username)?;
            let identity = handle
                .wait()
                .await
                .with_context(|| format!("Failed to launch {}", version))?;

            log::info!("{} finished playing {}", identity.username, version);
            Ok(())
        }
    }
}
