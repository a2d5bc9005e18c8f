//! Viewing and editing the signed-in user's profile.

use scholia::profile::ResearchPaperRef;

use super::*;

/// Subcommands of [`Commands::Profile`].
#[derive(Subcommand, Clone)]
pub enum ProfileCommands {
  /// Show your profile
  Show,

  /// Change profile fields; anything left out keeps its current value
  Set(ProfileArgs),
}

/// Fields accepted by `profile set`.
#[derive(Args, Clone, Default)]
pub struct ProfileArgs {
  /// Display name, also what paper signatures must match
  #[arg(long)]
  pub username:       Option<String>,
  /// Contact email shown to other users
  #[arg(long)]
  pub email:          Option<String>,
  /// Phone number
  #[arg(long)]
  pub contact:        Option<String>,
  /// Job title or role
  #[arg(long)]
  pub profession:     Option<String>,
  /// Institution or employer
  #[arg(long)]
  pub university:     Option<String>,
  /// Link to your CV
  #[arg(long)]
  pub cv:             Option<String>,
  /// Personal site or portfolio
  #[arg(long)]
  pub portfolio:      Option<String>,
  /// Research topic seeding your feeds; repeat for several. Replaces the current topics.
  #[arg(long = "topic")]
  pub topics:         Vec<String>,
  /// One of your publications as `TITLE=URL`; repeat for several. Replaces the current list.
  #[arg(long = "research-paper")]
  pub research_paper: Vec<String>,
}

/// Blank values clear a field.
fn optional(value: String) -> Option<String> {
  Some(value.trim().to_string()).filter(|value| !value.is_empty())
}

fn research_paper(value: &str) -> Result<ResearchPaperRef> {
  let (title, url) = value
    .split_once('=')
    .ok_or_else(|| ScholiadError::Usage(format!("Expected TITLE=URL, got \"{value}\"")))?;
  Ok(ResearchPaperRef { title: title.trim().to_string(), url: url.trim().to_string() })
}

/// Applies the given fields on top of `profile`.
pub fn merge(mut profile: Profile, args: ProfileArgs) -> Result<Profile> {
  if let Some(username) = args.username {
    profile.username = username;
  }
  let fields = [
    (args.email, &mut profile.email),
    (args.contact, &mut profile.contact_no),
    (args.profession, &mut profile.profession),
    (args.university, &mut profile.university),
    (args.cv, &mut profile.cv_url),
    (args.portfolio, &mut profile.portfolio_link),
  ];
  for (value, field) in fields {
    if let Some(value) = value {
      *field = optional(value);
    }
  }
  if !args.topics.is_empty() {
    profile.topics = args.topics;
  }
  if !args.research_paper.is_empty() {
    profile.research_papers =
      args.research_paper.iter().map(|value| research_paper(value)).collect::<Result<_>>()?;
  }
  Ok(profile)
}

/// Function for the [`Commands::Profile`] in the CLI.
pub async fn profile<I: UserInteraction>(interaction: &I, app: &mut App, cmd: ProfileCommands) -> Result<()> {
  let account = app.session.require_account()?.clone();
  match cmd {
    ProfileCommands::Show => match app.session.profile() {
      Some(profile) => interaction.reply(ResponseContent::Profile(profile)),
      None => interaction.reply(ResponseContent::Info("No profile yet, create one with `profile set`")),
    },
    ProfileCommands::Set(args) => {
      let current =
        app.session.profile().cloned().unwrap_or_else(|| Profile::new(&account.id, &account.full_name));
      let profile = app.session.update_profile(merge(current, args)?).await?;
      interaction.reply(ResponseContent::Success("Profile saved"))?;
      interaction.reply(ResponseContent::Profile(&profile))
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_merge_keeps_unset_fields() {
    let mut current = Profile::new("u1", "Ada").with_topics(["nlp"]);
    current.university = Some("Cambridge".into());

    let args = ProfileArgs {
      email: Some("ada@example.org".into()),
      university: Some("  ".into()),
      research_paper: vec!["Notes = https://example.org/notes".into()],
      ..Default::default()
    };
    let merged = merge(current, args).unwrap();
    assert_eq!(merged.username, "Ada");
    assert_eq!(merged.email.as_deref(), Some("ada@example.org"));
    assert_eq!(merged.university, None);
    assert_eq!(merged.topics, vec!["nlp".to_string()]);
    assert_eq!(merged.research_papers[0].url, "https://example.org/notes");
  }

  #[test]
  fn test_research_paper_needs_separator() {
    assert!(matches!(research_paper("no separator"), Err(ScholiadError::Usage(_))));
  }
}
