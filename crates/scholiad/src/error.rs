//! Errors surfaced by the command line.

use scholia::error::ScholiaError;
use thiserror::Error;

/// Result type of every command.
pub type Result<T> = core::result::Result<T, ScholiadError>;

/// Errors that end a command.
#[derive(Error, Debug)]
pub enum ScholiadError {
  /// A library operation failed.
  #[error(transparent)]
  Scholia(#[from] ScholiaError),

  /// A prompt could not be shown or read.
  #[error(transparent)]
  Dialog(#[from] dialoguer::Error),

  /// Reading or writing a file failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),

  /// A cleanup pattern did not parse.
  #[error(transparent)]
  Glob(#[from] glob::PatternError),

  /// Arguments that parsed but don't make sense together.
  #[error("{0}")]
  Usage(String),
}
