//! Research paper discovery, personal libraries and co-authoring.
//!
//! `scholia` is a library for finding papers and working on new ones together, providing:
//!
//! - Search, topic feeds and recommendations over arXiv and Semantic Scholar
//! - A personal library of saved papers with free-text tags
//! - Authored papers with a URN that invited collaborators use to join
//! - PDF resolution, ingestion and a capped AI chat per paper
//! - Local storage of accounts, profiles and papers in SQLite
//!
//! # Getting Started
//!
//! ```no_run
//! use scholia::{
//!   database::{Database, JoinPaper},
//!   external::PaperSource,
//!   prelude::*,
//!   retriever::Discovery,
//!   session::SessionStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!   let mut session = SessionStore::new(Database::open(Database::default_path()).await?);
//!   let me = session.sign_in("ada@example.org", "correct horse").await?;
//!
//!   // Search with automatic fallback to the other source
//!   let discovery = Discovery::default();
//!   let papers = discovery.search("graph transformers", PaperSource::SemanticScholar, None).await;
//!   if let Some(first) = papers.papers().first() {
//!     session.toggle_save(first).await?;
//!   }
//!
//!   // Join a paper whose author put us on its allow-list
//!   let paper = JoinPaper::new("URN123456789".parse()?, &me.id).execute(session.database()).await?;
//!   println!("Joined {}", paper.title);
//!   Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`retriever`]: arXiv and Semantic Scholar adapters, fallback search and feeds
//! - [`library`]: saved papers and tags
//! - [`authored`], [`collaboration`], [`urn`]: papers written on the platform and who may join
//! - [`assistant`]: the PDF and chat service client
//! - [`session`]: sign-in and per-user cached state
//! - [`database`]: the SQLite store and its instructions
//! - [`configuration`]: layered settings

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt::Display,
  path::{Path, PathBuf},
  str::FromStr,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)]
use {tempfile::tempdir, tracing_test::traced_test};

pub mod assistant;
pub mod authored;
pub mod collaboration;
pub mod configuration;
pub mod database;
pub mod error;
pub mod external;
pub mod library;
pub mod notification;
pub mod profile;
pub mod retriever;
pub mod session;
pub mod urn;

use crate::error::*;

/// Common traits and types for ergonomic imports.
///
/// ```no_run
/// use scholia::{database::Database, prelude::*};
///
/// async fn example() -> Result<(), ScholiaError> {
///   let mut db = Database::open(Database::default_path()).await?;
///   let mine = scholia::database::ListMyPapers::for_user("me").execute(&mut db).await?;
///   println!("{} papers", mine.len());
///   Ok(())
/// }
/// ```
pub mod prelude {
  pub use crate::{
    assistant::ChatBackend, database::DatabaseInstruction, error::ScholiaError,
    retriever::PaperAdapter,
  };
}
