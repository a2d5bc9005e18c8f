//! Runtime configuration.
//!
//! Values are layered: built-in defaults, then a TOML file, then `SCHOLIA_*` environment
//! variables. For example `SCHOLIA_SERVICE_URL=http://pdf.internal:8000` overrides the file.
//!
//! ```no_run
//! # fn example() -> scholia::error::Result<()> {
//! let config = scholia::configuration::Config::load(None)?;
//! println!("Database at {}", config.database_path.display());
//! # Ok(())
//! # }
//! ```

use config::{Environment, File};

use super::*;
use crate::{
  assistant::ASSISTANT_SERVICE_URL,
  database::Database,
  external::PaperSource,
  retriever::{
    arxiv::ARXIV_API_URL,
    semantic_scholar::{RECOMMENDATIONS_API_URL, SEMANTIC_SCHOLAR_API_URL},
    YearFilter,
  },
};

fn default_database_path() -> PathBuf { Database::default_path() }
fn default_service_url() -> String { ASSISTANT_SERVICE_URL.to_string() }
fn default_arxiv_url() -> String { ARXIV_API_URL.to_string() }
fn default_semantic_scholar_url() -> String { SEMANTIC_SCHOLAR_API_URL.to_string() }
fn default_recommendations_url() -> String { RECOMMENDATIONS_API_URL.to_string() }
fn default_year_filter() -> String { "2014-".to_string() }
fn default_search_limit() -> usize { 20 }
fn default_feed_limit() -> usize { 15 }
fn default_trending_limit() -> usize { 12 }
fn default_recommendation_limit() -> usize { 12 }
fn default_source() -> PaperSource { PaperSource::SemanticScholar }

/// Settings shared by the library and the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  /// Where the SQLite database lives.
  #[serde(default = "default_database_path")]
  pub database_path:        PathBuf,
  /// Base URL of the PDF ingestion and chat service.
  #[serde(default = "default_service_url")]
  pub service_url:          String,
  /// arXiv Atom API endpoint.
  #[serde(default = "default_arxiv_url")]
  pub arxiv_url:            String,
  /// Semantic Scholar graph API base URL.
  #[serde(default = "default_semantic_scholar_url")]
  pub semantic_scholar_url: String,
  /// Semantic Scholar recommendations API base URL.
  #[serde(default = "default_recommendations_url")]
  pub recommendations_url:  String,
  /// Year filter used when a search doesn't name one.
  #[serde(default = "default_year_filter")]
  pub default_year_filter:  String,
  /// Results per search.
  #[serde(default = "default_search_limit")]
  pub search_limit:         usize,
  /// Results per topic in a feed.
  #[serde(default = "default_feed_limit")]
  pub feed_limit:           usize,
  /// Results in the trending feed.
  #[serde(default = "default_trending_limit")]
  pub trending_limit:       usize,
  /// Related papers per recommendation request.
  #[serde(default = "default_recommendation_limit")]
  pub recommendation_limit: usize,
  /// Source searched first when none is given.
  #[serde(default = "default_source")]
  pub default_source:       PaperSource,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_path:        default_database_path(),
      service_url:          default_service_url(),
      arxiv_url:            default_arxiv_url(),
      semantic_scholar_url: default_semantic_scholar_url(),
      recommendations_url:  default_recommendations_url(),
      default_year_filter:  default_year_filter(),
      search_limit:         default_search_limit(),
      feed_limit:           default_feed_limit(),
      trending_limit:       default_trending_limit(),
      recommendation_limit: default_recommendation_limit(),
      default_source:       default_source(),
    }
  }
}

impl Config {
  /// `~/.scholia/config.toml`, or `./.scholia/config.toml` without a home directory.
  pub fn default_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".scholia").join("config.toml")
  }

  /// Loads the layered configuration. A missing file is not an error.
  pub fn load(path: Option<&Path>) -> Result<Self> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
    debug!("Loading configuration from {}", path.display());

    let config = config::Config::builder()
      .add_source(File::from(path.as_path()).required(false))
      .add_source(Environment::with_prefix("SCHOLIA"))
      .build()?
      .try_deserialize::<Self>()?;

    config.validate()?;
    Ok(config)
  }

  /// Writes this configuration as TOML, creating parent directories.
  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(self)?)?;
    debug!("Saved configuration to {}", path.display());
    Ok(())
  }

  /// Replaces the database location.
  pub fn with_database_path(mut self, path: impl AsRef<Path>) -> Self {
    self.database_path = path.as_ref().to_path_buf();
    self
  }

  /// Replaces the assistant service address.
  pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
    self.service_url = url.into();
    self
  }

  fn validate(&self) -> Result<()> {
    self.default_year_filter.parse::<YearFilter>()?;
    if self.search_limit == 0 || self.feed_limit == 0 || self.trending_limit == 0 {
      return Err(ScholiaError::Config("Result limits must be greater than zero".into()));
    }
    Ok(())
  }
}
