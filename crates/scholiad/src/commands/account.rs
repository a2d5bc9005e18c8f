//! Signing up, in and out.

use super::*;

/// Arguments for [`Commands::Signup`].
#[derive(Args, Clone)]
pub struct SignupArgs {
  /// Email to sign in with
  #[arg(long)]
  pub email:    String,
  /// Full name, also used as the profile's display name
  #[arg(long)]
  pub name:     String,
  /// Prompted for when left out
  #[arg(long)]
  pub password: Option<String>,
}

/// Arguments for [`Commands::Login`].
#[derive(Args, Clone)]
pub struct LoginArgs {
  /// Email of the account
  #[arg(long)]
  pub email:    String,
  /// Prompted for when left out
  #[arg(long)]
  pub password: Option<String>,
}

fn password<I: UserInteraction>(interaction: &I, given: Option<String>) -> Result<String> {
  match given {
    Some(password) => Ok(password),
    None => interaction.secret("Password"),
  }
}

/// Function for the [`Commands::Signup`] in the CLI.
pub async fn signup<I: UserInteraction>(interaction: &I, app: &mut App, args: SignupArgs) -> Result<()> {
  let SignupArgs { email, name, password: given } = args;
  let password = password(interaction, given)?;
  let account = app.session.sign_up(&email, &password, &name).await?;

  // every account starts with a profile named after it
  app.session.update_profile(Profile::new(&account.id, &account.full_name)).await?;
  interaction.reply(ResponseContent::Success("Account created"))?;
  interaction.reply(ResponseContent::Account(&account))
}

/// Function for the [`Commands::Login`] in the CLI.
pub async fn login<I: UserInteraction>(interaction: &I, app: &mut App, args: LoginArgs) -> Result<()> {
  let password = password(interaction, args.password)?;
  let account = app.session.sign_in(&args.email, &password).await?;
  interaction.reply(ResponseContent::Success(&format!("Signed in as {}", account.email)))
}

/// Function for the [`Commands::Logout`] in the CLI.
pub async fn logout<I: UserInteraction>(interaction: &I, app: &mut App) -> Result<()> {
  if app.session.account().is_none() {
    return interaction.reply(ResponseContent::Info("Not signed in"));
  }
  app.session.sign_out().await?;
  interaction.reply(ResponseContent::Success("Signed out"))
}

/// Function for the [`Commands::Whoami`] in the CLI.
pub async fn whoami<I: UserInteraction>(interaction: &I, app: &mut App) -> Result<()> {
  let account = app.session.require_account()?;
  interaction.reply(ResponseContent::Account(account))
}
