//! The signed-in user's saved papers and tags.

use scholia::library::SaveToggle;

use super::{discover::run_search, *};

/// Arguments for [`Commands::Save`].
#[derive(Args, Clone)]
pub struct SaveArgs {
  /// Search to pick a paper from
  pub query: Option<String>,

  /// Source to search first
  #[arg(long, short)]
  pub source: Option<String>,

  /// Publication years: 2019, 2014- or 2014-2020
  #[arg(long, short)]
  pub year: Option<String>,

  /// Which search hit to toggle, counting from 1
  #[arg(long, default_value_t = 1)]
  pub pick: usize,

  /// Toggle a paper already in your library by its id instead of searching
  #[arg(long, conflicts_with = "query")]
  pub id: Option<String>,
}

/// Arguments for [`Commands::Tag`].
#[derive(Args, Clone)]
pub struct TagArgs {
  /// Id of a saved paper
  pub id: String,

  /// The complete new tag list; leave out to clear all tags
  pub tags: Vec<String>,
}

/// Arguments for [`Commands::Library`].
#[derive(Args, Clone)]
pub struct LibraryArgs {
  /// Only papers carrying this tag
  #[arg(long)]
  pub tag: Option<String>,
}

/// Function for the [`Commands::Save`] in the CLI.
pub async fn save<I: UserInteraction>(interaction: &I, app: &mut App, args: SaveArgs) -> Result<()> {
  app.session.require_account()?;

  let SaveArgs { query, source, year, pick, id } = args;
  let paper = match (id, query) {
    (Some(id), _) => app
      .session
      .library(None)
      .await?
      .into_iter()
      .find(|saved| saved.paper_id == id)
      .map(|saved| saved.to_external())
      .ok_or_else(|| ScholiaError::NotFound(format!("Saved paper {id}")))?,
    (None, Some(query)) => {
      let papers = run_search(interaction, app, &SearchArgs { query, source, year }).await?;
      let index = pick.checked_sub(1).filter(|i| *i < papers.len()).ok_or_else(|| {
        ScholiadError::Usage(format!("--pick must be between 1 and {}", papers.len()))
      })?;
      papers.into_iter().nth(index).ok_or_else(|| ScholiadError::Usage("No such search hit".into()))?
    },
    (None, None) => return Err(ScholiadError::Usage("Pass a search query or --id".into())),
  };

  match app.session.toggle_save(&paper).await? {
    SaveToggle::Saved => interaction.reply(ResponseContent::Success(&format!("Saved \"{}\"", paper.title))),
    SaveToggle::Unsaved =>
      interaction.reply(ResponseContent::Success(&format!("Removed \"{}\" from your library", paper.title))),
  }
}

/// Function for the [`Commands::Tag`] in the CLI.
pub async fn tag<I: UserInteraction>(interaction: &I, app: &mut App, args: TagArgs) -> Result<()> {
  let saved = app.session.set_tags(&args.id, &args.tags).await?;
  let message = if saved.tags.is_empty() {
    format!("Cleared tags on \"{}\"", saved.title)
  } else {
    format!("Tagged \"{}\" with {}", saved.title, saved.tags.join(", "))
  };
  interaction.reply(ResponseContent::Success(&message))
}

/// Function for the [`Commands::Tags`] in the CLI.
pub async fn tags<I: UserInteraction>(interaction: &I, app: &mut App) -> Result<()> {
  let tags = app.session.user_tags().await?;
  if tags.is_empty() {
    return interaction.reply(ResponseContent::Info("No tags yet"));
  }
  for tag in tags {
    interaction.reply(ResponseContent::Info(&tag))?;
  }
  Ok(())
}

/// Function for the [`Commands::Untag`] in the CLI.
pub async fn untag<I: UserInteraction>(interaction: &I, app: &mut App, tag: &str) -> Result<()> {
  app.session.require_account()?;
  if !interaction.confirm(&format!("Remove the tag \"{tag}\" from every paper in your library?"))? {
    return interaction.reply(ResponseContent::Info("Operation cancelled"));
  }

  let cascade = app.session.delete_tag(tag).await?;
  if cascade.is_complete() {
    interaction.reply(ResponseContent::Success(&format!(
      "Removed \"{tag}\" from {} papers",
      cascade.updated
    )))
  } else {
    interaction.reply(ResponseContent::Warning(&format!(
      "Removed \"{tag}\" from {} papers, {} could not be updated",
      cascade.updated, cascade.failed
    )))
  }
}

/// Function for the [`Commands::Library`] in the CLI.
pub async fn library<I: UserInteraction>(interaction: &I, app: &mut App, args: LibraryArgs) -> Result<()> {
  let papers = app.session.library(args.tag.as_deref()).await?;
  interaction.reply(ResponseContent::Library(&papers))
}
