use super::*;

pub mod account;
pub mod assistant;
pub mod clean;
pub mod discover;
pub mod init;
pub mod library;
pub mod paper;
pub mod profile;

pub use account::{login, logout, signup, whoami, LoginArgs, SignupArgs};
pub use assistant::{chat, pdf, ChatArgs, PdfCommands};
pub use clean::clean;
pub use discover::{feed, recommend, search, FeedArgs, RecommendArgs, SearchArgs};
pub use init::{init, InitArgs};
pub use library::{library, save, tag, tags, untag, LibraryArgs, SaveArgs, TagArgs};
pub use paper::{join, paper, PaperCommands};
pub use profile::{profile, ProfileCommands};

/// Available commands for the CLI
#[derive(Subcommand, Clone)]
pub enum Commands {
  /// Write a configuration file and create the database
  Init(InitArgs),

  /// Create an account and sign in
  Signup(SignupArgs),

  /// Sign in to an existing account
  Login(LoginArgs),

  /// Sign out and forget the remembered session
  Logout,

  /// Show the signed-in account and its UUID
  Whoami,

  /// Show or change your profile
  Profile {
    #[command(subcommand)]
    cmd: ProfileCommands,
  },

  /// Search arXiv or Semantic Scholar, falling back to the other source
  Search(SearchArgs),

  /// Build a feed from your research topics
  Feed(FeedArgs),

  /// Papers related to a paper
  Recommend(RecommendArgs),

  /// Save a search hit, or remove a paper from your library
  Save(SaveArgs),

  /// Replace the tags of a saved paper
  Tag(TagArgs),

  /// List every tag in your library
  Tags,

  /// Remove a tag from every paper in your library
  Untag {
    /// The tag to remove
    tag: String,
  },

  /// List saved papers
  Library(LibraryArgs),

  /// Write papers and manage who may join them
  Paper {
    #[command(subcommand)]
    cmd: PaperCommands,
  },

  /// Join a paper as a collaborator using its URN
  Join {
    /// The paper's URN, e.g. URN123456789
    urn: String,
  },

  /// Find and ingest paper PDFs through the assistant service
  Pdf {
    #[command(subcommand)]
    cmd: PdfCommands,
  },

  /// Ask the assistant about a paper
  Chat(ChatArgs),

  /// Removes the entire database after confirmation
  Clean,
}

/// Runs every command that needs an open [`App`].
pub async fn run<I: UserInteraction + Sync>(interaction: &I, app: &mut App, command: Commands) -> Result<()> {
  match command {
    Commands::Signup(args) => signup(interaction, app, args).await,
    Commands::Login(args) => login(interaction, app, args).await,
    Commands::Logout => logout(interaction, app).await,
    Commands::Whoami => whoami(interaction, app).await,
    Commands::Profile { cmd } => profile(interaction, app, cmd).await,
    Commands::Search(args) => search(interaction, app, args).await,
    Commands::Feed(args) => feed(interaction, app, args).await,
    Commands::Recommend(args) => recommend(interaction, app, args).await,
    Commands::Save(args) => save(interaction, app, args).await,
    Commands::Tag(args) => tag(interaction, app, args).await,
    Commands::Tags => tags(interaction, app).await,
    Commands::Untag { tag } => untag(interaction, app, &tag).await,
    Commands::Library(args) => library(interaction, app, args).await,
    Commands::Paper { cmd } => paper(interaction, app, cmd).await,
    Commands::Join { urn } => join(interaction, app, &urn).await,
    Commands::Pdf { cmd } => pdf(interaction, app, cmd).await,
    Commands::Chat(args) => chat(interaction, app, args).await,
    Commands::Init(_) | Commands::Clean =>
      Err(ScholiadError::Usage("This command does not use an open database".into())),
  }
}

/// Parses a value the library knows how to parse, for arguments taken as plain strings.
pub(crate) fn parse_arg<T>(value: &str) -> Result<T>
where T: FromStr<Err = ScholiaError> {
  Ok(value.parse()?)
}
