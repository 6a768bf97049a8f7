//! segcut - Segment-based video cutter
//!
//! Define named time ranges over a video, preview each one on its own and
//! export them as separate files through ffmpeg.
//!
//! # Usage
//!
//! ```bash
//! segcut inspect --in talk.mov
//! segcut cut --in talk.mov -s 0:10-0:20=Intro -s 1:00-1:45=Q&A --resolution 1280x720
//! segcut preview --in talk.mov -s 10-20 --loops 2
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use segcut::app::container::DefaultAppContainer;
use segcut::cli::{commands, Cli, Commands};
use segcut::config_initialization::initialize_configuration_hierarchy;
use segcut::utils::logging::LoggingSystem;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = initialize_configuration_hierarchy(&cli)?;

    let logging = LoggingSystem::new(loaded.config.logging.clone());
    logging
        .initialize()
        .context("Failed to initialize logging")?;
    logging.log_system_info();
    loaded.log_sources();

    let container =
        DefaultAppContainer::new(loaded.config).context("Failed to set up services")?;

    let result = match cli.command {
        Commands::Inspect(args) => {
            info!("Executing inspect command");
            commands::inspect(&container, args).await
        }
        Commands::Cut(args) => {
            info!("Executing cut command");
            commands::cut(&container, args).await
        }
        Commands::Preview(args) => {
            info!("Executing preview command");
            commands::preview(&container, args).await
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
