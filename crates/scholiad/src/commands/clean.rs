//! Module for removing a [`scholia`] database.

use super::*;

/// Function for the [`Commands::Clean`] in the CLI.
pub async fn clean<I: UserInteraction>(interaction: &I, cli: &Cli) -> Result<()> {
  let path = match &cli.path {
    Some(path) => path.clone(),
    None => {
      let config = Config::load(Some(&cli.config_path()))?;
      interaction.reply(ResponseContent::Info(&format!(
        "Using configured database path: {}",
        config.database_path.display()
      )))?;
      config.database_path
    },
  };

  if !path.exists() {
    return interaction
      .reply(ResponseContent::Warning(&format!("No database found at: {}", path.display())));
  }

  interaction.reply(ResponseContent::Warning(&format!("Database found at: {}", path.display())))?;
  if !interaction.confirm("Are you sure you want to delete this database?")? {
    return interaction.reply(ResponseContent::Info("Operation cancelled"));
  }
  if !interaction.accept_defaults() && interaction.prompt("Type DELETE to confirm deletion")? != "DELETE" {
    return interaction.reply(ResponseContent::Info("Operation cancelled"));
  }

  std::fs::remove_file(&path)?;
  // SQLite keeps `-wal`, `-shm` and `-journal` files next to the database
  for file in glob::glob(&format!("{}-*", path.display()))?.flatten() {
    std::fs::remove_file(file)?;
  }
  interaction.reply(ResponseContent::Success("Database files cleaned"))
}
