mod app;
mod cache;
mod checkout;
mod cli;
mod config;
mod event;
mod flight;
mod logging;
mod model;
mod remote;
mod sync;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use cache::{KeyValueStore, MemoryStorage, SqliteStorage};
use remote::HttpRemote;

#[derive(Parser, Debug)]
#[command(name = "meowmenu")]
#[command(about = "Breakfast-shop ordering that keeps working offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./meowmenu.yaml, then $XDG_CONFIG_HOME/meowmenu/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Display name to act as (default: the last one used)
  #[arg(short, long)]
  user: Option<String>,

  /// Keep the local cache in memory for this run only
  #[arg(short, long)]
  ephemeral: bool,

  #[command(subcommand)]
  command: cli::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  let store: Arc<dyn KeyValueStore> = if args.ephemeral {
    Arc::new(MemoryStorage::new())
  } else {
    Arc::new(SqliteStorage::open(config.cache.path.as_deref())?)
  };

  let remote = HttpRemote::new(&config.api)?;
  if !remote.is_configured() {
    info!("No API url configured, working from the local cache only");
  }

  let mut app = app::App::new(config, Arc::new(remote), store)?;
  match args.user {
    Some(name) => {
      app.login(&name)?;
    }
    None => {
      if !app.restore_session()? {
        debug!("No remembered user");
      }
    }
  }

  let result = cli::run(&mut app, args.command).await;

  // Nothing may be left half-written when the runtime shuts down
  app.sync().flush().await;

  result
}
