//! Local SQLite store for accounts, profiles, authored papers and libraries.
//!
//! Every operation is a small struct implementing [`DatabaseInstruction`], so callers build the
//! operation first and then run it against an open [`Database`]:
//!
//! ```no_run
//! use scholia::{
//!   database::{Database, GetPaper},
//!   prelude::*,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut db = Database::open(Database::default_path()).await?;
//! if let Some(paper) = GetPaper::by_urn("URN123456789").execute(&mut db).await? {
//!   println!("{} needs {} collaborators", paper.title, paper.open_slots());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! List-valued columns (tags, authors, collaborator ids) are stored as JSON text.

use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use super::*;

pub mod instruction;

pub use self::instruction::*;

/// Config key under which the remembered session token is kept.
pub const SESSION_TOKEN_KEY: &str = "session_token";

/// Handle to the local database.
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Opens the database at `path`, creating the file, its parent directories and the schema as
  /// needed.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    debug!("Opening database at {}", path.display());

    let conn = Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.execute_batch(include_str!(concat!(
          env!("CARGO_MANIFEST_DIR"),
          "/migrations/init.sql"
        )))?;
        Ok(())
      })
      .await?;

    Ok(Self { conn })
  }

  /// Returns the default path for the database file.
  ///
  /// - On Unix: `~/.local/share/scholia/scholia.db`
  /// - On macOS: `~/Library/Application Support/scholia/scholia.db`
  /// - On Windows: `%APPDATA%\scholia\scholia.db`
  /// - Fallback: `./scholia/scholia.db`
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("scholia").join("scholia.db")
  }

  /// Reads a value from the local `config` table.
  pub async fn config_value(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_string();
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row("SELECT value FROM config WHERE key = ?1", params![key], |row| row.get::<_, String>(0))
              .optional()?,
          )
        })
        .await?,
    )
  }

  /// Writes a value to the local `config` table, replacing any earlier one.
  pub async fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
    let (key, value) = (key.to_string(), value.to_string());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO config (key, value) VALUES (?1, ?2)
           ON CONFLICT(key) DO UPDATE SET value = excluded.value",
          params![key, value],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Deletes a value from the local `config` table. A missing key is not an error.
  pub async fn remove_config_value(&self, key: &str) -> Result<()> {
    let key = key.to_string();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM config WHERE key = ?1", params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl std::fmt::Debug for Database {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Database").finish_non_exhaustive()
  }
}
