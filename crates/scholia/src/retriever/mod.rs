//! Searching arXiv and Semantic Scholar.
//!
//! Each source sits behind the [`PaperAdapter`] trait and maps its own response schema into
//! [`ExternalPaper`] with a pure function that can be tested without the network:
//!
//! - [`arxiv`]: the Atom query feed
//! - [`semantic_scholar`]: the graph search, bulk search and recommendation endpoints
//!
//! Callers search through [`search_with_fallback`], which tries the chosen source once and the
//! other source once more if that fails. Nothing is retried beyond that, and results from the
//! two sources are never merged.
//!
//! # Examples
//!
//! ```no_run
//! use scholia::retriever::{
//!   arxiv::ArxivClient, search_with_fallback, semantic_scholar::SemanticScholarClient,
//!   YearFilter,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ss = SemanticScholarClient::new();
//! let arxiv = ArxivClient::new();
//! let year: YearFilter = "2014-".parse()?;
//!
//! let outcome = search_with_fallback(&ss, &arxiv, "graph neural networks", Some(&year), 20).await;
//! for paper in outcome.into_result()? {
//!   println!("{} ({} citations)", paper.title, paper.citation_count);
//! }
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, sync::RwLock};

use chrono::Datelike;

use super::*;
use crate::external::{ExternalPaper, PaperSource};

pub mod arxiv;
pub mod discovery;
pub mod semantic_scholar;

pub use self::{arxiv::ArxivClient, discovery::Discovery, semantic_scholar::SemanticScholarClient};

lazy_static! {
  static ref TRAILING_VERSION: Regex = Regex::new(r"(?i)v\d+$").unwrap();
  static ref YEAR: Regex = Regex::new(r"^\d{4}$").unwrap();
}

/// Removes a trailing arXiv version marker such as `v2`.
pub(crate) fn strip_version(id: &str) -> &str {
  match TRAILING_VERSION.find(id) {
    Some(m) => &id[..m.start()],
    None => id,
  }
}

/// A publication year restriction.
///
/// Written as `2019`, `2014-` (open ended) or `2014-2020`. Semantic Scholar takes the string
/// as-is; arXiv gets a `submittedDate` range clause, see [`YearFilter::arxiv_clause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YearFilter {
  Single(i32),
  From(i32),
  Range(i32, i32),
}

impl YearFilter {
  /// The first and last year covered, with an open end resolved to `current_year`.
  pub fn bounds(&self, current_year: i32) -> (i32, i32) {
    match *self {
      Self::Single(year) => (year, year),
      Self::From(start) => (start, current_year),
      Self::Range(start, end) => (start, end),
    }
  }

  /// The clause appended to an arXiv `search_query`, including its leading ` AND `.
  pub fn arxiv_clause(&self, current_year: i32) -> String {
    let (start, end) = self.bounds(current_year);
    format!(" AND submittedDate:[{start}01010000 TO {end}12312359]")
  }
}

impl Display for YearFilter {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Single(year) => write!(f, "{year}"),
      Self::From(start) => write!(f, "{start}-"),
      Self::Range(start, end) => write!(f, "{start}-{end}"),
    }
  }
}

impl FromStr for YearFilter {
  type Err = ScholiaError;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || ScholiaError::InvalidYearFilter(s.to_string());
    let year = |part: &str| -> Result<i32> {
      let part = part.trim();
      if YEAR.is_match(part) {
        part.parse().map_err(|_| invalid())
      } else {
        Err(invalid())
      }
    };

    match s.trim().split_once('-') {
      None => Ok(Self::Single(year(s)?)),
      Some((start, end)) if end.trim().is_empty() => Ok(Self::From(year(start)?)),
      Some((start, end)) => {
        let (start, end) = (year(start)?, year(end)?);
        if start > end {
          return Err(invalid());
        }
        Ok(Self::Range(start, end))
      },
    }
  }
}

/// The current calendar year, used to close open-ended year filters.
pub(crate) fn current_year() -> i32 { Utc::now().year() }

/// One source of external papers.
#[async_trait]
pub trait PaperAdapter: Send + Sync {
  fn source(&self) -> PaperSource;

  /// Runs a free-text search, most cited first where the source supports it.
  async fn fetch_by_query(
    &self,
    query: &str,
    year: Option<&YearFilter>,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>>;

  /// Papers related to `paper_id`, where the id was issued by `source`.
  async fn fetch_recommendations(
    &self,
    paper_id: &str,
    source: PaperSource,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>>;
}

/// Pulls the bare identifier out of an arXiv or DOI link and drops any version suffix.
///
/// Only applied when arXiv is the primary source. `https://arxiv.org/abs/2301.00001v3` becomes
/// `2301.00001`; plain text queries pass through unless they happen to end in `v<digits>`.
pub fn normalize_arxiv_query(query: &str) -> String {
  let mut processed = query;
  if query.contains("arxiv.org/abs/") {
    processed = query.split("arxiv.org/abs/").nth(1).unwrap_or(query);
  }
  if query.contains("doi.org/") {
    processed = query.split("doi.org/").nth(1).unwrap_or(query);
  }
  strip_version(processed).to_string()
}

/// How a fallback search ended.
#[derive(Debug)]
pub enum SearchOutcome {
  /// The chosen source answered.
  Primary(Vec<ExternalPaper>),
  /// The chosen source failed and the other one answered.
  Fallback { papers: Vec<ExternalPaper>, primary_error: ScholiaError },
  /// Both sources failed.
  NoResults { primary_error: ScholiaError, fallback_error: ScholiaError },
}

impl SearchOutcome {
  /// The papers found, empty when both sources failed.
  pub fn papers(&self) -> &[ExternalPaper] {
    match self {
      Self::Primary(papers) | Self::Fallback { papers, .. } => papers,
      Self::NoResults { .. } => &[],
    }
  }

  /// Whether the chosen source failed.
  pub fn used_fallback(&self) -> bool { !matches!(self, Self::Primary(_)) }

  /// The papers, or [`ScholiaError::NoResults`] when both sources failed.
  pub fn into_result(self) -> Result<Vec<ExternalPaper>> {
    match self {
      Self::Primary(papers) | Self::Fallback { papers, .. } => Ok(papers),
      Self::NoResults { .. } => Err(ScholiaError::NoResults),
    }
  }
}

/// Searches `primary`, and `fallback` exactly once if `primary` fails.
///
/// When arXiv is primary the query is first passed through [`normalize_arxiv_query`]. The
/// fallback always gets the raw query text and the same year filter.
pub async fn search_with_fallback(
  primary: &dyn PaperAdapter,
  fallback: &dyn PaperAdapter,
  query: &str,
  year: Option<&YearFilter>,
  limit: usize,
) -> SearchOutcome {
  let primary_query = match primary.source() {
    PaperSource::Arxiv => normalize_arxiv_query(query),
    PaperSource::SemanticScholar => query.to_string(),
  };

  let primary_error = match primary.fetch_by_query(&primary_query, year, limit).await {
    Ok(papers) => return SearchOutcome::Primary(papers),
    Err(e) => e,
  };
  warn!("{} search failed ({primary_error}), trying {}", primary.source(), fallback.source());

  match fallback.fetch_by_query(query, year, limit).await {
    Ok(papers) => SearchOutcome::Fallback { papers, primary_error },
    Err(fallback_error) => {
      warn!("Fallback search also failed: {fallback_error}");
      SearchOutcome::NoResults { primary_error, fallback_error }
    },
  }
}

/// Short tag used inside cache keys.
fn cache_tag(source: PaperSource) -> &'static str {
  match source {
    PaperSource::Arxiv => "arxiv",
    PaperSource::SemanticScholar => "ss",
  }
}

/// Session-lifetime memo of topic feed results.
///
/// Keys look like `recent:ss:{topic}:{year}`. Nothing is ever evicted; the cache lives as long
/// as the [`Discovery`] that owns it.
#[derive(Debug, Default)]
pub struct SearchCache {
  entries: RwLock<HashMap<String, Vec<ExternalPaper>>>,
}

impl SearchCache {
  /// An empty cache.
  pub fn new() -> Self { Self::default() }

  /// The cache key for one topic of one feed.
  pub fn key(feed: &str, source: PaperSource, topic: &str, year: &YearFilter) -> String {
    format!("{feed}:{}:{topic}:{year}", cache_tag(source))
  }

  /// A cached result, if this key was filled before.
  pub fn get(&self, key: &str) -> Option<Vec<ExternalPaper>> {
    self.entries.read().unwrap_or_else(|e| e.into_inner()).get(key).cloned()
  }

  /// Stores a result, replacing any earlier one.
  pub fn insert(&self, key: String, papers: Vec<ExternalPaper>) {
    self.entries.write().unwrap_or_else(|e| e.into_inner()).insert(key, papers);
  }

  /// Number of cached results.
  pub fn len(&self) -> usize { self.entries.read().unwrap_or_else(|e| e.into_inner()).len() }

  /// Whether nothing is cached.
  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
