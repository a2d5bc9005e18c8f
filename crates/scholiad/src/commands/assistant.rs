//! PDF lookup, ingestion and chatting about a paper through the assistant service.

use scholia::assistant::{ChatSession, IgnorePages, MAX_QUESTIONS};

use super::*;

/// Subcommands of [`Commands::Pdf`].
#[derive(Subcommand, Clone)]
pub enum PdfCommands {
  /// Find a direct PDF link for a paper's landing page
  Resolve { url: String },

  /// Ingest a PDF so that chat can answer from its full text
  Process {
    url: String,

    /// Pages to skip: none, all, or a list such as `1-3,7`
    #[arg(long, default_value = "none")]
    ignore_pages: String,
  },
}

/// Arguments for [`Commands::Chat`].
#[derive(Args, Clone)]
pub struct ChatArgs {
  /// Chat about a paper from your library
  #[arg(long, conflicts_with = "title")]
  pub id: Option<String>,

  /// Title of the paper when it is not in your library
  #[arg(long)]
  pub title: Option<String>,

  /// Abstract of the paper when it is not in your library
  #[arg(long = "abstract")]
  pub abstract_text: Option<String>,

  /// Ingest this PDF first and answer from its full text
  #[arg(long)]
  pub pdf: Option<String>,

  /// Questions to ask in order; without any, questions are read interactively
  pub questions: Vec<String>,
}

/// Function for the [`Commands::Pdf`] in the CLI.
pub async fn pdf<I: UserInteraction>(interaction: &I, app: &mut App, cmd: PdfCommands) -> Result<()> {
  match cmd {
    PdfCommands::Resolve { url } => {
      interaction.notify("Looking for a PDF...");
      let resolution = app.assistant.resolve_pdf(&url).await;
      match resolution.pdf_link {
        Some(link) => {
          let source = resolution.source_name.or(resolution.source).unwrap_or_else(|| "unknown".into());
          interaction.reply(ResponseContent::Success(&format!("Found a PDF via {source}")))?;
          interaction.reply(ResponseContent::Link(&link))
        },
        None => interaction.reply(ResponseContent::Warning("No PDF found")),
      }
    },
    PdfCommands::Process { url, ignore_pages } => {
      let ignore = parse_arg::<IgnorePages>(&ignore_pages)?;
      interaction.notify("Processing PDF...");
      let ingestion = app.assistant.process_pdf(&url, &ignore).await?;
      interaction.reply(ResponseContent::Success(&format!(
        "Processed {}/{} pages into {} chunks",
        ingestion.processed_pages, ingestion.total_pages, ingestion.chunks_created
      )))
    },
  }
}

/// Function for the [`Commands::Chat`] in the CLI.
pub async fn chat<I: UserInteraction + Sync>(interaction: &I, app: &mut App, args: ChatArgs) -> Result<()> {
  let (title, abstract_text) = match &args.id {
    Some(id) => {
      let saved = app.session.library(None).await?;
      let paper = saved
        .into_iter()
        .find(|paper| &paper.paper_id == id)
        .ok_or_else(|| ScholiaError::NotFound(format!("Saved paper {id}")))?;
      (paper.title, paper.abstract_text)
    },
    None => match args.title {
      Some(title) => (title, args.abstract_text.unwrap_or_default()),
      None => return Err(ScholiadError::Usage("Pass --id or --title to pick a paper".into())),
    },
  };

  let mut session = ChatSession::new(&app.assistant, title.as_str(), abstract_text);
  if let Some(pdf_url) = &args.pdf {
    interaction.notify("Processing PDF...");
    let ingestion = app.assistant.process_pdf(pdf_url, &IgnorePages::None).await?;
    debug!("Ingested {} chunks from {pdf_url}", ingestion.chunks_created);
    session.use_processed_pdf(pdf_url);
  }

  interaction.reply(ResponseContent::Info(&format!(
    "Ask up to {MAX_QUESTIONS} questions about \"{title}\""
  )))?;

  let interactive = args.questions.is_empty() && !interaction.accept_defaults();
  let mut questions = args.questions.into_iter();
  loop {
    let question = match questions.next() {
      Some(question) => question,
      None if interactive => interaction.prompt("Question (empty to stop)")?,
      None => break,
    };
    if question.trim().is_empty() {
      break;
    }

    interaction.notify("Thinking...");
    let answer = session
      .ask(&question, |chunk| {
        if let Err(e) = interaction.stream(chunk) {
          debug!("Dropped a chat chunk: {e}");
        }
      })
      .await;
    println!();
    match answer {
      Ok(_) => {},
      Err(ScholiaError::ChatLimitReached(limit)) => {
        interaction.reply(ResponseContent::Warning(&format!(
          "You have reached the limit of {limit} questions for this paper"
        )))?;
        break;
      },
      Err(e) => return Err(e.into()),
    }
    if session.remaining() == 0 {
      interaction.reply(ResponseContent::Info("No questions left for this paper"))?;
      break;
    }
  }

  interaction.reply(ResponseContent::Info(&format!("{} questions left", session.remaining())))
}
