//! Error types for the scholia library.
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! [`ScholiaError`] covers:
//! - Network and external API failures
//! - Local store failures
//! - Form validation and authorization failures
//! - Collaboration join rejections
//!
//! # Examples
//!
//! ```no_run
//! use scholia::{error::ScholiaError, urn::Urn};
//!
//! match "URN12".parse::<Urn>() {
//!   Err(ScholiaError::InvalidUrn(msg)) => println!("{msg}"),
//!   Err(e) => println!("Other error: {e}"),
//!   Ok(urn) => println!("Parsed {urn}"),
//! }
//! ```

use thiserror::Error;

use crate::collaboration::JoinRejection;

/// Error type alias used for the [`scholia`](crate) crate.
pub type Result<T> = core::result::Result<T, ScholiaError>;

/// Errors that can occur when working with the scholia library.
#[derive(Error, Debug)]
pub enum ScholiaError {
  /// A URN failed the form-level length check.
  #[error("{0}")]
  InvalidUrn(String),

  /// The provided source string couldn't be parsed.
  ///
  /// The string parameter contains the invalid source value.
  #[error("Invalid paper source \"{0}\", expected `arxiv` or `semantic-scholar`")]
  InvalidSource(String),

  /// A year filter did not look like `2019`, `2014-` or `2014-2020`.
  #[error("Invalid year filter \"{0}\"")]
  InvalidYearFilter(String),

  /// A network request failed.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// The requested record couldn't be found.
  #[error("{0} not found")]
  NotFound(String),

  /// An external API answered with something we can't use.
  #[error("API error: {0}")]
  ApiError(String),

  /// Every configured search source failed for a query.
  #[error("No papers found from either source")]
  NoResults,

  /// The external PDF/chat service returned an error payload.
  #[error("{0}")]
  Service(String),

  /// A form field failed validation.
  #[error("{0}")]
  Validation(String),

  /// The acting user may not perform the operation.
  #[error("{0}")]
  Unauthorized(String),

  /// A collaborator join attempt was refused.
  #[error(transparent)]
  Join(#[from] JoinRejection),

  /// An operation needed a signed-in user.
  #[error("Please sign in to continue")]
  NotSignedIn,

  /// Credentials didn't match a known account.
  #[error("Invalid email or password")]
  InvalidCredentials,

  /// An account with this email already exists.
  #[error("An account with email \"{0}\" already exists")]
  DuplicateAccount(String),

  /// The chat session already used all of its questions.
  #[error("You have reached the maximum of {0} questions for this paper")]
  ChatLimitReached(usize),

  /// Password hashing failed.
  #[error("Password hashing failed: {0}")]
  PasswordHash(String),

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// A JSON payload couldn't be encoded or decoded.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// A configuration file couldn't be read.
  #[error(transparent)]
  TomlDe(#[from] toml::de::Error),

  /// A configuration file couldn't be written.
  #[error(transparent)]
  TomlSer(#[from] toml::ser::Error),

  /// Layered configuration failed to load.
  #[error(transparent)]
  ConfigSource(#[from] config::ConfigError),

  #[error("{0}")]
  Config(String),
}

impl From<argon2::password_hash::Error> for ScholiaError {
  fn from(e: argon2::password_hash::Error) -> Self { Self::PasswordHash(e.to_string()) }
}
