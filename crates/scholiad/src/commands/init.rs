//! Module for setting up a [`scholia`] environment

use super::*;

/// Arguments for [`Commands::Init`].
#[derive(Args, Clone)]
pub struct InitArgs {
  /// Base URL of the PDF and chat service
  #[arg(long)]
  pub service_url: Option<String>,
}

/// Function for the [`Commands::Init`] in the CLI.
pub async fn init<I: UserInteraction>(interaction: &I, cli: &Cli, args: InitArgs) -> Result<()> {
  let config_path = cli.config_path();
  let mut config = Config::load(Some(&config_path))?;

  let database_path = match &cli.path {
    Some(path) => path.clone(),
    None if interaction.confirm(&format!(
      "Would you like to use the path {:?} for storing the scholia database?",
      config.database_path,
    ))? =>
      config.database_path.clone(),
    None => {
      interaction.reply(ResponseContent::Info(
        "Please pass in your intended database path using --path",
      ))?;
      return Ok(());
    },
  };

  if database_path.exists() {
    interaction.reply(ResponseContent::Info(&format!(
      "Database already exists at {}, keeping its contents",
      database_path.display()
    )))?;
  }

  config = config.with_database_path(&database_path);
  if let Some(url) = args.service_url {
    config = config.with_service_url(url);
  }
  config.save(&config_path)?;
  Database::open(&database_path).await?;

  interaction.reply(ResponseContent::Success(&format!(
    "Scholia initialized successfully\nConfig path: {}\nDatabase path: {}",
    config_path.display(),
    database_path.display(),
  )))
}
