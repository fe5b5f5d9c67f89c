use std::env;
use std::error::Error;

use clap::Parser;
use swipeview::cli::{Cli, Sub};
use swipeview::replay::{self, Script};
use swipeview_config::Config;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "swipeview=info";

fn main() -> Result<(), Box<dyn Error>> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    match cli.subcommand {
        Some(Sub::Validate) => {
            let Some(path) = cli.config else {
                return Err("validate needs a config file, pass it with --config".into());
            };
            match Config::load(&path) {
                Ok(_) => {
                    info!("config is valid");
                    Ok(())
                }
                Err(err) => {
                    warn!("{err:?}");
                    Err("config is invalid".into())
                }
            }
        }
        Some(Sub::Replay { script }) => {
            let config = match &cli.config {
                Some(path) => Config::load(path).unwrap_or_else(|err| {
                    warn!("{err:?}");
                    Config::default()
                }),
                None => Config::default(),
            };

            let script = Script::load(&script)?;
            let summary = replay::run(script, &config)?;
            info!(
                "active workspace {} of {}, settled: {}",
                summary.active_workspace + 1,
                summary.workspaces,
                summary.settled
            );
            if summary.faults > 0 {
                return Err(format!("{} faults during replay", summary.faults).into());
            }
            Ok(())
        }
        None => {
            warn!("nothing to do, see --help");
            Ok(())
        }
    }
}
