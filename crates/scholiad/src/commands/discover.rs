//! Searching the external sources.

use scholia::{
  external::{ExternalPaper, PaperSource},
  retriever::{discovery::FeedKind, SearchOutcome, YearFilter},
};

use super::*;

/// Arguments for [`Commands::Search`].
#[derive(Args, Clone)]
pub struct SearchArgs {
  /// Free text, or an arXiv or DOI link
  pub query: String,

  /// Source to try first: arxiv or semantic-scholar. Defaults to the configured source.
  #[arg(long, short)]
  pub source: Option<String>,

  /// Publication years: 2019, 2014- or 2014-2020. Defaults to the configured filter.
  #[arg(long, short)]
  pub year: Option<String>,
}

/// Arguments for [`Commands::Feed`].
#[derive(Args, Clone)]
pub struct FeedArgs {
  /// trending, recent or best
  #[arg(default_value = "recent")]
  pub kind: String,

  /// Topic to include; repeat for several. Defaults to your profile's research topics.
  #[arg(long = "topic")]
  pub topics: Vec<String>,

  /// Publication years: 2019, 2014- or 2014-2020
  #[arg(long, short)]
  pub year: Option<String>,
}

/// Arguments for [`Commands::Recommend`].
#[derive(Args, Clone)]
pub struct RecommendArgs {
  /// Paper id as issued by its source
  pub id: String,

  /// Source that issued the id. Saved papers default to the source they were saved from.
  #[arg(long, short)]
  pub source: Option<String>,
}

fn year_filter(year: Option<&str>) -> Result<Option<YearFilter>> {
  year.map(parse_arg::<YearFilter>).transpose()
}

/// Runs a fallback search, telling the user when the other source answered.
pub(crate) async fn run_search<I: UserInteraction>(
  interaction: &I,
  app: &App,
  args: &SearchArgs,
) -> Result<Vec<ExternalPaper>> {
  let source = match &args.source {
    Some(source) => parse_arg::<PaperSource>(source)?,
    None => app.config.default_source,
  };
  let year = year_filter(args.year.as_deref())?;

  interaction.notify(&format!("Searching {source} for \"{}\"", args.query));
  let outcome = app.discovery.search(&args.query, source, year).await;
  if let SearchOutcome::Fallback { primary_error, .. } = &outcome {
    interaction.reply(ResponseContent::Warning(&format!(
      "{source} search failed ({primary_error}), showing {} results",
      source.other()
    )))?;
  }
  Ok(outcome.into_result()?)
}

/// Function for the [`Commands::Search`] in the CLI.
pub async fn search<I: UserInteraction>(interaction: &I, app: &mut App, args: SearchArgs) -> Result<()> {
  let papers = run_search(interaction, app, &args).await?;
  interaction.reply(ResponseContent::Results { papers: &papers, saved: app.session.saved_ids() })
}

/// Function for the [`Commands::Feed`] in the CLI.
pub async fn feed<I: UserInteraction>(interaction: &I, app: &mut App, args: FeedArgs) -> Result<()> {
  let kind = parse_arg::<FeedKind>(&args.kind)?;
  let year = year_filter(args.year.as_deref())?;

  let topics: Vec<String> = if args.topics.is_empty() {
    app.session.require_account()?;
    app.session.profile().map(|p| p.feed_topics().map(String::from).collect()).unwrap_or_default()
  } else {
    args.topics
  };
  if topics.is_empty() {
    return interaction.reply(ResponseContent::Info(
      "Add research topics with `profile set --topic` or pass --topic",
    ));
  }

  interaction.notify(&format!("Loading {kind} papers"));
  let feeds = app.discovery.feed(kind, topics.iter().map(String::as_str), year).await;
  interaction.reply(ResponseContent::Feed(&feeds))
}

/// Function for the [`Commands::Recommend`] in the CLI.
pub async fn recommend<I: UserInteraction>(interaction: &I, app: &mut App, args: RecommendArgs) -> Result<()> {
  let source = match &args.source {
    Some(source) => parse_arg::<PaperSource>(source)?,
    None => saved_source(app, &args.id).await?.unwrap_or(app.config.default_source),
  };

  interaction.notify("Fetching recommendations");
  let papers = app.discovery.recommendations_for(&args.id, source).await?;
  interaction.reply(ResponseContent::Results { papers: &papers, saved: app.session.saved_ids() })
}

/// Source of a paper in the signed-in user's library, if it is there.
async fn saved_source(app: &mut App, id: &str) -> Result<Option<PaperSource>> {
  if app.session.account().is_none() {
    return Ok(None);
  }
  let library = app.session.library(None).await?;
  Ok(library.iter().find(|paper| paper.paper_id == id).map(|paper| paper.source))
}
