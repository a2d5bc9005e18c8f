//! One struct per database operation.
//!
//! Instructions are grouped by the table they mostly touch:
//!
//! - [`auth`]: accounts and sign-in sessions
//! - [`profile`]: user profiles
//! - [`authored`]: authored papers
//! - [`collaboration`]: joining and the allow-list
//! - [`saved`]: saved papers and tags

#![allow(missing_docs, clippy::missing_docs_in_private_items)]

use rusqlite::{types::Type, Row};
use serde::de::DeserializeOwned;

use super::*;

pub mod auth;
pub mod authored;
pub mod collaboration;
pub mod profile;
pub mod saved;

pub use self::{auth::*, authored::*, collaboration::*, profile::*, saved::*};

/// An operation that can be executed against a [`Database`].
#[async_trait]
pub trait DatabaseInstruction {
  type Output;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output>;
}

/// Encodes a list or map column.
pub(crate) fn to_json<T: Serialize>(value: &T) -> rusqlite::Result<String> {
  serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Decodes a JSON text column.
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
  let raw: String = row.get(idx)?;
  serde_json::from_str(&raw)
    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decodes a text column through [`FromStr`].
pub(crate) fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
  T: FromStr,
  T::Err: Display, {
  let raw: String = row.get(idx)?;
  raw.parse().map_err(|e: T::Err| {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
  })
}
