//! Talking to the person at the terminal.

use std::collections::BTreeSet;

use console::Term;
use dialoguer::{Confirm, Input, Password};
use scholia::{
  authored::AuthoredPaper, database::PaperDraft, external::ExternalPaper, library::SavedPaper,
  notification::NotificationManager, profile::Profile, retriever::discovery::TopicFeed,
  session::Account,
};

use super::*;

/// Marks informational lines.
pub static INFO_PREFIX: &str = "ℹ ";
/// Marks transient status lines.
pub static WORKING_PREFIX: &str = "» ";
/// Marks completed operations.
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Marks errors.
pub static ERROR_PREFIX: &str = "✗ ";
/// Marks warnings.
pub static WARNING_PREFIX: &str = "! ";
/// Starts every prompt.
pub static PROMPT_PREFIX: &str = "❯ ";
/// Branch for a detail line.
pub static ITEM_PREFIX: &str = "├─";
/// Branch for the last detail line.
pub static LAST_ITEM_PREFIX: &str = "└─";
/// Starts a list entry.
pub static BULLET: &str = "•";
/// Points from a label to its value.
pub static ARROW: &str = "→";

/// Everything a command can show as its result.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// Search or recommendation hits, numbered from 1. Ids in `saved` are marked.
  Results { papers: &'a [ExternalPaper], saved: &'a BTreeSet<String> },
  /// One section per topic of a feed.
  Feed(&'a [TopicFeed]),
  /// Saved papers with their tags.
  Library(&'a [SavedPaper]),
  /// One authored paper in full.
  Paper(&'a AuthoredPaper),
  /// Authored papers, one line each.
  Papers(&'a [AuthoredPaper]),
  /// A paper's draft, printed as-is after a one-line header.
  Draft(&'a PaperDraft),
  /// A bare link or address, printed without decoration so it can be piped.
  Link(&'a str),
  /// A user profile.
  Profile(&'a Profile),
  /// The signed-in account and its UUID.
  Account(&'a Account),
  /// A completed operation.
  Success(&'a str),
  /// Something the user should notice.
  Warning(&'a str),
  /// A failure, written to stderr.
  Error(&'a ScholiadError),
  /// Neutral information.
  Info(&'a str),
}

/// How commands ask questions and show results.
pub trait UserInteraction {
  /// Whether prompts are skipped in favour of their defaults.
  fn accept_defaults(&self) -> bool;
  /// Asks a yes or no question.
  fn confirm(&self, message: &str) -> Result<bool>;
  /// Asks for a line of text.
  fn prompt(&self, message: &str) -> Result<String>;
  /// Asks for a value without echoing it.
  fn secret(&self, message: &str) -> Result<String>;
  /// Shows the result of a command.
  fn reply(&self, content: ResponseContent) -> Result<()>;
  /// Shows a transient status line that the next reply replaces.
  fn notify(&self, message: &str);
  /// Writes part of a streamed answer without a line break.
  fn stream(&self, chunk: &str) -> Result<()>;
}

/// The interactive terminal, or a non-interactive one when defaults are accepted.
#[derive(Debug)]
pub struct Terminal {
  accept_defaults: bool,
  notifications:   NotificationManager,
}

impl Terminal {
  /// A terminal that prompts unless `accept_defaults` is set.
  pub fn new(accept_defaults: bool) -> Self {
    Self { accept_defaults, notifications: NotificationManager::new() }
  }

  fn paper_results(&self, papers: &[ExternalPaper], saved: &BTreeSet<String>) {
    if papers.is_empty() {
      println!("{} No papers found", style(INFO_PREFIX).blue());
      return;
    }
    println!("{} Found {} papers:", style(SUCCESS_PREFIX).green(), style(papers.len()).yellow());
    for (i, paper) in papers.iter().enumerate() {
      let marker = if saved.contains(&paper.id) { style("★").yellow() } else { style(" ") };
      println!("{marker} {}. {}", style(i + 1).yellow(), style(&paper.title).white().bold());
      println!(
        "   {} {} {BULLET} {} {BULLET} {} citations",
        style(ITEM_PREFIX).dim(),
        summarize_authors(&paper.authors),
        if paper.published.is_empty() { "n.d." } else { paper.published.as_str() },
        paper.citation_count
      );
      println!(
        "   {} {} {ARROW} {}",
        style(LAST_ITEM_PREFIX).dim(),
        style(paper.source).cyan(),
        style(&paper.id).dim()
      );
    }
  }

  fn authored(&self, paper: &AuthoredPaper) {
    println!("{} {}", style(SUCCESS_PREFIX).green(), style(&paper.title).white().bold());
    let visibility = if paper.is_public { "public" } else { "private" };
    let rows = [
      ("URN", paper.urn.to_string()),
      ("Id", paper.id.clone()),
      ("Tags", paper.topic_tags.join(", ")),
      ("Template", paper.template.as_str().to_string()),
      ("Completion", format!("{}%", paper.completion_percentage)),
      (
        "Collaborators",
        format!("{}/{} joined, {visibility}", paper.collaborators.len(), paper.collaborators_needed),
      ),
      ("Authorized", paper.collaborators_authorized.join(", ")),
    ];
    for (label, value) in rows {
      println!("   {} {}: {}", style(ITEM_PREFIX).dim(), style(label).cyan(), value);
    }
    println!("   {} {}", style(LAST_ITEM_PREFIX).dim(), paper.abstract_text);
  }
}

/// First three author names, then a count of the rest.
fn summarize_authors(authors: &[String]) -> String {
  match authors.len() {
    0 => "Unknown authors".to_string(),
    n if n <= 3 => authors.join(", "),
    n => format!("{} +{} more", authors[..3].join(", "), n - 3),
  }
}

impl UserInteraction for Terminal {
  fn accept_defaults(&self) -> bool { self.accept_defaults }

  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    self.notifications.dismiss();
    Ok(
      Confirm::new()
        .with_prompt(format!("{} {message}", style(PROMPT_PREFIX).cyan()))
        .default(false)
        .interact()?,
    )
  }

  fn prompt(&self, message: &str) -> Result<String> {
    if self.accept_defaults {
      return Ok(String::new());
    }
    self.notifications.dismiss();
    Ok(
      Input::<String>::new()
        .with_prompt(format!("{} {message}", style(PROMPT_PREFIX).cyan()))
        .allow_empty(true)
        .interact_text()?,
    )
  }

  fn secret(&self, message: &str) -> Result<String> {
    if self.accept_defaults {
      return Err(ScholiadError::Usage(format!("{message} must be passed as an argument")));
    }
    self.notifications.dismiss();
    Ok(Password::new().with_prompt(format!("{} {message}", style(PROMPT_PREFIX).cyan())).interact()?)
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    self.notifications.dismiss();
    match content {
      ResponseContent::Results { papers, saved } => self.paper_results(papers, saved),
      ResponseContent::Feed(feeds) =>
        for feed in feeds {
          println!("\n{} {}", style(BULLET).cyan(), style(&feed.topic).cyan().bold());
          match &feed.error {
            Some(error) => println!("   {} {error}", style(WARNING_PREFIX).yellow()),
            None => self.paper_results(&feed.papers, &BTreeSet::new()),
          }
        },
      ResponseContent::Library(papers) =>
        if papers.is_empty() {
          println!("{} Your library is empty", style(INFO_PREFIX).blue());
        } else {
          for paper in papers {
            println!("{} {}", style(BULLET).cyan(), style(&paper.title).white().bold());
            println!("   {} {}", style(ITEM_PREFIX).dim(), style(&paper.paper_id).dim());
            let tags = if paper.tags.is_empty() { "no tags".to_string() } else { paper.tags.join(", ") };
            println!("   {} {}", style(LAST_ITEM_PREFIX).dim(), style(tags).yellow());
          }
        },
      ResponseContent::Paper(paper) => self.authored(paper),
      ResponseContent::Papers(papers) =>
        if papers.is_empty() {
          println!("{} No papers found", style(INFO_PREFIX).blue());
        } else {
          for paper in papers {
            println!(
              "{} {} {} {}",
              style(BULLET).cyan(),
              style(&paper.urn).yellow(),
              style(&paper.title).white().bold(),
              style(format!("({}% complete)", paper.completion_percentage)).dim()
            );
          }
        },
      ResponseContent::Draft(draft) => {
        let access = if draft.can_save { "editable" } else { "read-only, only the first author can save" };
        println!(
          "{} {} {}",
          style(SUCCESS_PREFIX).green(),
          style(&draft.paper.title).white().bold(),
          style(format!("({access})")).dim()
        );
        println!("{}", draft.content);
      },
      ResponseContent::Link(link) => println!("{link}"),
      ResponseContent::Profile(profile) => {
        println!("{} {}", style(SUCCESS_PREFIX).green(), style(&profile.username).white().bold());
        let optional = [
          ("Email", &profile.email),
          ("Contact", &profile.contact_no),
          ("Profession", &profile.profession),
          ("University", &profile.university),
          ("CV", &profile.cv_url),
          ("Portfolio", &profile.portfolio_link),
        ];
        for (label, value) in optional {
          if let Some(value) = value {
            println!("   {} {}: {value}", style(ITEM_PREFIX).dim(), style(label).cyan());
          }
        }
        for paper in &profile.research_papers {
          println!("   {} {} {ARROW} {}", style(ITEM_PREFIX).dim(), paper.title, paper.url);
        }
        println!(
          "   {} {}: {}",
          style(LAST_ITEM_PREFIX).dim(),
          style("Topics").cyan(),
          profile.topics.join(", ")
        );
      },
      ResponseContent::Account(account) => {
        println!("{} {} <{}>", style(SUCCESS_PREFIX).green(), account.full_name, account.email);
        println!("   {} UUID: {}", style(LAST_ITEM_PREFIX).dim(), style(&account.id).yellow());
      },
      ResponseContent::Success(message) => println!("{} {message}", style(SUCCESS_PREFIX).green()),
      ResponseContent::Warning(message) => println!("{} {message}", style(WARNING_PREFIX).yellow()),
      ResponseContent::Error(error) => eprintln!("{} {error}", style(ERROR_PREFIX).red()),
      ResponseContent::Info(message) => println!("{} {message}", style(INFO_PREFIX).blue()),
    }
    Ok(())
  }

  fn notify(&self, message: &str) {
    let term = Term::stderr();
    if !term.is_term() {
      return;
    }
    if term.write_line(&format!("{} {message}", style(WORKING_PREFIX).dim())).is_ok() {
      self.notifications.show(move || {
        let _ = Term::stderr().clear_last_lines(1);
      });
    }
  }

  fn stream(&self, chunk: &str) -> Result<()> {
    self.notifications.dismiss();
    let mut term = Term::stdout();
    std::io::Write::write_all(&mut term, chunk.as_bytes())?;
    std::io::Write::flush(&mut term)?;
    Ok(())
  }
}
