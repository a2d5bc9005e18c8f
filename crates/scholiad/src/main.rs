//! Command line front end for the `scholia` research paper toolkit.
//!
//! The `scholia` binary drives every part of the library from a terminal:
//! - Accounts, sign-in and profiles
//! - Search, topic feeds and recommendations over arXiv and Semantic Scholar
//! - A personal library of saved, tagged papers
//! - Authoring papers and inviting collaborators to join them by URN
//! - PDF resolution, ingestion and chatting about a paper
//!
//! # Usage
//!
//! ```bash
//! # Write a configuration and create the database
//! scholia init
//!
//! # Create an account and tell others your UUID
//! scholia signup --email ada@example.org --name "Ada Lovelace"
//! scholia whoami
//!
//! # Find and save papers
//! scholia search "graph transformers" --source arxiv
//! scholia save "graph transformers" --pick 2
//! scholia tag <PAPER_ID> reading nlp
//!
//! # Co-author
//! scholia paper create --title "..." --tags nlp --abstract "..." --motive "..." --agree
//! scholia paper authorize <PAPER_ID> <UUID>
//! scholia join URN123456789
//! ```
//!
//! Verbosity is raised with `-v` (repeatable); `--log-dir` additionally writes a daily log file.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{path::PathBuf, str::FromStr};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use scholia::{
  assistant::AssistantClient, configuration::Config, database::Database, error::ScholiaError,
  prelude::*, profile::Profile, retriever::Discovery, session::SessionStore,
};
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Discover, save, tag and co-author research papers")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the database file. Overrides the path from the configuration file.
  #[arg(long, short, global = true)]
  path: Option<PathBuf>,

  /// Configuration file to use instead of `~/.scholia/config.toml`.
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Also write logs to a daily rolling file in this directory.
  #[arg(long, global = true)]
  log_dir: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

impl Cli {
  fn config_path(&self) -> PathBuf { self.config.clone().unwrap_or_else(Config::default_path) }

  fn database_path(&self, config: &Config) -> PathBuf {
    self.path.clone().unwrap_or_else(|| config.database_path.clone())
  }
}

/// Everything a signed-in command works with.
pub struct App {
  /// Settings loaded for this run.
  pub config:    Config,
  /// The local store and the signed-in user.
  pub session:   SessionStore,
  /// arXiv and Semantic Scholar clients.
  pub discovery: Discovery,
  /// The PDF and chat service client.
  pub assistant: AssistantClient,
}

impl App {
  /// Loads the configuration, opens the database and picks up a remembered session.
  pub async fn open(cli: &Cli) -> Result<Self> {
    let config = Config::load(Some(&cli.config_path()))?;
    let path = cli.database_path(&config);
    trace!("Using database at: {}", path.display());

    let mut session = SessionStore::new(Database::open(&path).await?);
    if let Some(account) = session.restore().await? {
      debug!("Restored session for {}", account.email);
    }
    let discovery = Discovery::from_config(&config)?;
    let assistant = AssistantClient::new().with_base_url(&config.service_url);
    Ok(Self { config, session, discovery, assistant })
  }
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// With a log directory the output goes to a daily rolling file instead of stderr. The returned
/// guard flushes that file and must be held until exit.
fn setup_logging(
  verbosity: u8,
  log_dir: Option<&PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true);

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "scholia.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      builder.with_writer(writer).with_ansi(false).init();
      Some(guard)
    },
    None => {
      builder.with_writer(std::io::stderr).init();
      None
    },
  }
}

/// Entry point for the `scholia` CLI application
///
/// Parses the arguments, sets up logging and runs the requested command. `init` and `clean`
/// work on files directly; every other command opens the configured database first.
#[tokio::main]
async fn main() {
  let cli = Cli::parse();
  let _guard = setup_logging(cli.verbose, cli.log_dir.as_ref());
  let terminal = Terminal::new(cli.accept_defaults);

  let result = match cli.command.clone() {
    Commands::Init(args) => init(&terminal, &cli, args).await,
    Commands::Clean => clean(&terminal, &cli).await,
    command => match App::open(&cli).await {
      Ok(mut app) => run(&terminal, &mut app, command).await,
      Err(e) => Err(e),
    },
  };

  if let Err(e) = result {
    if terminal.reply(ResponseContent::Error(&e)).is_err() {
      eprintln!("{} {e}", style(ERROR_PREFIX).red());
    }
    std::process::exit(1);
  }
}
