//! Papers written on the platform, and who may work on them.

use std::path::PathBuf;

use scholia::{
  authored::{
    contact_author_mailto, export_file_name, export_html, AuthoredPaper, NewPaper, PaperEdit,
    Template,
  },
  collaboration::dropped_populated_slots,
  database::*,
  urn::Urn,
};

use super::*;

/// Subcommands of [`Commands::Paper`].
#[derive(Subcommand, Clone)]
pub enum PaperCommands {
  /// Start a new paper as its first author
  Create(CreateArgs),

  /// Show one paper by id or URN
  Show {
    /// Paper id or URN
    paper: String,
  },

  /// List papers you author or collaborate on
  List,

  /// Edit a paper you author, including its collaborator slots
  Edit(EditArgs),

  /// Make a paper you author public or private
  Visibility {
    id: String,

    /// Hide the paper from public search
    #[arg(long)]
    private: bool,
  },

  /// Allow a user to join a paper you author
  Authorize {
    id:      String,
    /// The user's UUID
    user_id: String,
  },

  /// Take a user off a paper's allow-list and collaborators
  Revoke { id: String, user_id: String },

  /// Delete a paper you author
  Delete { id: String },

  /// Search public papers by title, abstract, motive or topic tag
  Find { query: String },

  /// Print a mailto link asking a paper's author to authorize you
  Contact {
    /// Paper id or URN
    paper: String,
  },

  /// Show the draft of a paper you author or collaborate on
  Open {
    /// Paper id or URN
    paper: String,
  },

  /// Replace the draft of a paper you author
  Write {
    id: String,

    /// HTML file holding the new draft
    #[arg(long, conflicts_with = "content")]
    file: Option<PathBuf>,

    /// The new draft inline
    #[arg(long)]
    content: Option<String>,
  },

  /// Save the draft of a paper you are on as a standalone HTML page
  Export {
    /// Paper id or URN
    paper: String,

    /// Where to write the page; defaults to the title in the current directory
    #[arg(long, short)]
    output: Option<PathBuf>,
  },
}

/// Arguments for `paper create`.
#[derive(Args, Clone)]
pub struct CreateArgs {
  /// Title of the paper
  #[arg(long)]
  pub title:         String,
  /// Comma separated topic tags
  #[arg(long)]
  pub tags:          String,
  /// The abstract
  #[arg(long = "abstract")]
  pub abstract_text: String,
  /// Why you are writing it
  #[arg(long)]
  pub motive:        String,
  /// How far along the draft is, in percent
  #[arg(long, default_value_t = 0)]
  pub completion:    u32,
  /// ieee, springer, acm, nature or elsevier
  #[arg(long, default_value = "ieee")]
  pub template:      String,
  /// How many collaborators you are looking for (1-10)
  #[arg(long, default_value_t = 1)]
  pub collaborators: u32,
  /// Your profile name; defaults to it when you agree to the terms
  #[arg(long)]
  pub signature:     Option<String>,
  /// Agree to the terms of collaboration
  #[arg(long)]
  pub agree:         bool,
  /// List the paper in public search; papers start private
  #[arg(long)]
  pub public:        bool,
}

/// Arguments for `paper edit`.
#[derive(Args, Clone)]
pub struct EditArgs {
  /// Id of the paper
  pub id:            String,
  /// New title
  #[arg(long)]
  pub title:         Option<String>,
  /// New comma separated topic tags
  #[arg(long)]
  pub tags:          Option<String>,
  /// New abstract
  #[arg(long = "abstract")]
  pub abstract_text: Option<String>,
  /// New motive
  #[arg(long)]
  pub motive:        Option<String>,
  /// New completion percentage
  #[arg(long)]
  pub completion:    Option<u32>,
  /// New number of collaborator slots
  #[arg(long)]
  pub collaborators: Option<u32>,
  /// Fill a slot as `INDEX=UUID` (counting from 1); an empty UUID clears it
  #[arg(long = "slot")]
  pub slots:         Vec<String>,
}

/// Parses `INDEX=UUID` into a zero-based slot index and the id.
fn slot(value: &str) -> Result<(usize, String)> {
  let usage = || ScholiadError::Usage(format!("Expected INDEX=UUID with INDEX from 1, got \"{value}\""));
  let (index, user_id) = value.split_once('=').ok_or_else(usage)?;
  let index = index.trim().parse::<usize>().ok().and_then(|i| i.checked_sub(1)).ok_or_else(usage)?;
  Ok((index, user_id.trim().to_string()))
}

/// Looks a paper up by id, then by URN.
async fn find_paper(db: &mut Database, key: &str) -> Result<AuthoredPaper> {
  if let Some(paper) = GetPaper::by_id(key).execute(db).await? {
    return Ok(paper);
  }
  Ok(
    GetPaper::by_urn(key)
      .execute(db)
      .await?
      .ok_or_else(|| ScholiaError::NotFound(format!("Paper {key}")))?,
  )
}

/// Function for the [`Commands::Paper`] in the CLI.
pub async fn paper<I: UserInteraction>(interaction: &I, app: &mut App, cmd: PaperCommands) -> Result<()> {
  let me = app.session.require_account()?.clone();

  match cmd {
    PaperCommands::Create(args) => {
      let signature = match args.signature {
        Some(signature) => signature,
        None => app.session.profile().map(|p| p.username.clone()).unwrap_or_default(),
      };
      let form = NewPaper {
        title: args.title,
        topic_tags: args.tags,
        abstract_text: args.abstract_text,
        motive: args.motive,
        completion_percentage: args.completion,
        template: parse_arg::<Template>(&args.template)?,
        collaborators_needed: args.collaborators,
        agreement: args.agree,
        signature,
        is_public: args.public,
      };
      form.validate(app.session.profile())?;
      let paper = CreatePaper::new(form.into_paper(&me.id)).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Success(&format!(
        "Created paper {}. Share its URN with the collaborators you authorize.",
        paper.urn
      )))?;
      interaction.reply(ResponseContent::Paper(&paper))
    },

    PaperCommands::Show { paper } => {
      let paper = find_paper(app.session.database(), &paper).await?;
      if !paper.is_public && !paper.is_member(&me.id) {
        return Err(ScholiaError::NotFound(format!("Paper {}", paper.id)).into());
      }
      interaction.reply(ResponseContent::Paper(&paper))?;

      let ids = paper.collaborators.iter().chain([&paper.author_id]);
      let names = ProfileNames::of(ids).execute(app.session.database()).await?;
      let author = names.get(&paper.author_id).cloned().unwrap_or_else(|| paper.author_id.clone());
      interaction.reply(ResponseContent::Info(&format!("Author: {author}")))?;
      for id in &paper.collaborators {
        let name = names.get(id).map(String::as_str).unwrap_or("Unknown");
        interaction.reply(ResponseContent::Info(&format!("Collaborator: {name} ({id})")))?;
      }
      Ok(())
    },

    PaperCommands::List => {
      let papers = ListMyPapers::for_user(&me.id).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Papers(&papers))
    },

    PaperCommands::Edit(args) => {
      let current = find_paper(app.session.database(), &args.id).await?;
      current.ensure_author(&me.id)?;

      let mut edit = PaperEdit::from_paper(&current);
      if let Some(title) = args.title {
        edit.title = title;
      }
      if let Some(tags) = args.tags {
        edit.topic_tags = tags;
      }
      if let Some(abstract_text) = args.abstract_text {
        edit.abstract_text = abstract_text;
      }
      if let Some(motive) = args.motive {
        edit.motive = motive;
      }
      if let Some(completion) = args.completion {
        edit.completion_percentage = completion;
      }
      for value in &args.slots {
        let (index, user_id) = slot(value)?;
        edit.set_slot(index, user_id)?;
      }
      if let Some(needed) = args.collaborators {
        edit.set_collaborators_needed(needed);
      }

      let dropped = dropped_populated_slots(&edit.slots, edit.collaborators_needed as usize);
      if !dropped.is_empty()
        && !interaction.confirm(&format!(
          "Slots beyond {} are discarded, which removes {}. Continue?",
          edit.collaborators_needed,
          dropped.join(", ")
        ))?
      {
        return interaction.reply(ResponseContent::Info("Operation cancelled"));
      }

      let update = UpdatePaper::new(&current.id, &me.id, edit).execute(app.session.database()).await?;
      for removed in &update.removed {
        interaction.reply(ResponseContent::Warning(&format!("{removed} is no longer a collaborator")))?;
      }
      interaction.reply(ResponseContent::Success("Paper updated"))?;
      interaction.reply(ResponseContent::Paper(&update.paper))
    },

    PaperCommands::Visibility { id, private } => {
      let paper = SetVisibility::new(&id, &me.id, !private).execute(app.session.database()).await?;
      let state = if paper.is_public { "public" } else { "private" };
      interaction.reply(ResponseContent::Success(&format!("\"{}\" is now {state}", paper.title)))
    },

    PaperCommands::Authorize { id, user_id } => {
      let paper = AuthorizeCollaborator::new(&id, &me.id, &user_id).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Success(&format!(
        "{user_id} may now join with {} ({}/{} slots authorized)",
        paper.urn,
        paper.collaborators_authorized.len(),
        paper.collaborators_needed
      )))
    },

    PaperCommands::Revoke { id, user_id } => {
      let (_, changed) =
        RevokeCollaborator::new(&id, &me.id, &user_id).execute(app.session.database()).await?;
      if changed {
        interaction.reply(ResponseContent::Success(&format!("Revoked {user_id}")))
      } else {
        interaction.reply(ResponseContent::Info(&format!("{user_id} was not on this paper")))
      }
    },

    PaperCommands::Delete { id } => {
      if !interaction.confirm("Are you sure you want to delete this paper?")? {
        return interaction.reply(ResponseContent::Info("Operation cancelled"));
      }
      DeletePaper::new(&id, &me.id).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Success("Paper deleted"))
    },

    PaperCommands::Find { query } => {
      let papers = SearchPublicPapers::new(query).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Papers(&papers))
    },

    PaperCommands::Contact { paper } => {
      let paper = find_paper(app.session.database(), &paper).await?;
      let email = AuthorEmail::of(&paper.author_id)
        .execute(app.session.database())
        .await?
        .ok_or_else(|| ScholiaError::NotFound("Author email".into()))?;
      let me_profile = app.session.profile().cloned().unwrap_or_else(|| Profile::new(&me.id, &me.full_name));
      let note = format!("Send this to the author of \"{}\":", paper.title);
      interaction.reply(ResponseContent::Info(&note))?;
      interaction.reply(ResponseContent::Link(&contact_author_mailto(&paper, &email, &me_profile)))
    },

    PaperCommands::Open { paper } => {
      let paper = find_paper(app.session.database(), &paper).await?;
      let draft = OpenDraft::by_id(&paper.id, &me.id).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Draft(&draft))
    },

    PaperCommands::Write { id, file, content } => {
      let content = match (file, content) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(content)) => content,
        (None, None) =>
          return Err(ScholiadError::Usage("Pass --file or --content with the new draft".into())),
      };
      let paper = SaveContent::new(&id, &me.id, content).execute(app.session.database()).await?;
      interaction.reply(ResponseContent::Success(&format!("Saved the draft of \"{}\"", paper.title)))
    },

    PaperCommands::Export { paper, output } => {
      let paper = find_paper(app.session.database(), &paper).await?;
      let draft = OpenDraft::by_id(&paper.id, &me.id).execute(app.session.database()).await?;
      let path = output.unwrap_or_else(|| PathBuf::from(export_file_name(&draft.paper.title)));
      std::fs::write(&path, export_html(&draft.paper.title, &draft.content))?;
      interaction.reply(ResponseContent::Success(&format!("Exported the draft to {}", path.display())))
    },
  }
}

/// Function for the [`Commands::Join`] in the CLI.
pub async fn join<I: UserInteraction>(interaction: &I, app: &mut App, urn: &str) -> Result<()> {
  let me = app.session.require_account()?.id.clone();
  let urn = parse_arg::<Urn>(urn)?;
  let paper = JoinPaper::new(urn, &me).execute(app.session.database()).await?;
  interaction.reply(ResponseContent::Success(&format!("You joined \"{}\"", paper.title)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_slot_parsing() {
    assert_eq!(slot("1=abc").unwrap(), (0, "abc".to_string()));
    assert_eq!(slot("3 = ").unwrap(), (2, String::new()));
    assert!(slot("0=abc").is_err());
    assert!(slot("abc").is_err());
  }
}
