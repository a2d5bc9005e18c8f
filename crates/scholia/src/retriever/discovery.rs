//! Search, topic feeds and recommendations over both sources.

use super::*;
use super::semantic_scholar::SearchMode;
use crate::configuration::Config;

/// The personalised feeds built from a profile's research topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
  /// arXiv submissions from the last few days.
  Trending,
  /// Semantic Scholar relevance search, most cited first.
  Recent,
  /// Semantic Scholar bulk search, most cited first.
  Best,
}

impl FeedKind {
  /// The feed name used on the command line and in cache keys.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Trending => "trending",
      Self::Recent => "recent",
      Self::Best => "best",
    }
  }
}

impl Display for FeedKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for FeedKind {
  type Err = ScholiaError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "trending" => Ok(Self::Trending),
      "recent" => Ok(Self::Recent),
      "best" => Ok(Self::Best),
      _ => Err(ScholiaError::Config(format!("Unknown feed \"{s}\""))),
    }
  }
}

/// One topic's slice of a feed. A failed topic has no papers and an error message; the other
/// topics are unaffected.
#[derive(Debug, Clone)]
pub struct TopicFeed {
  /// The research topic searched.
  pub topic:  String,
  /// Hits for the topic.
  pub papers: Vec<ExternalPaper>,
  /// Why the topic failed, if it did.
  pub error:  Option<String>,
}

/// Result counts for each kind of request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
  /// Results per search.
  pub search:          usize,
  /// Results per topic in the recent and best feeds.
  pub feed:            usize,
  /// Results per topic in the trending feed.
  pub trending:        usize,
  /// Related papers per request.
  pub recommendations: usize,
}

impl Default for Limits {
  fn default() -> Self { Self { search: 20, feed: 15, trending: 12, recommendations: 12 } }
}

/// Entry point for everything that talks to arXiv or Semantic Scholar.
#[derive(Debug)]
pub struct Discovery {
  arxiv:            ArxivClient,
  semantic_scholar: SemanticScholarClient,
  cache:            SearchCache,
  default_year:     YearFilter,
  limits:           Limits,
}

impl Default for Discovery {
  fn default() -> Self { Self::new(ArxivClient::new(), SemanticScholarClient::new()) }
}

impl Discovery {
  /// Uses the given clients with default limits and a 2014 onwards year filter.
  pub fn new(arxiv: ArxivClient, semantic_scholar: SemanticScholarClient) -> Self {
    Self {
      arxiv,
      semantic_scholar,
      cache: SearchCache::new(),
      default_year: YearFilter::From(2014),
      limits: Limits::default(),
    }
  }

  /// Builds clients and limits from a loaded [`Config`].
  pub fn from_config(config: &Config) -> Result<Self> {
    let arxiv = ArxivClient::new().with_base_url(&config.arxiv_url);
    let semantic_scholar = SemanticScholarClient::new()
      .with_base_url(&config.semantic_scholar_url)
      .with_recommendations_url(&config.recommendations_url);
    Ok(Self {
      default_year: config.default_year_filter.parse()?,
      limits: Limits {
        search:          config.search_limit,
        feed:            config.feed_limit,
        trending:        config.trending_limit,
        recommendations: config.recommendation_limit,
      },
      ..Self::new(arxiv, semantic_scholar)
    })
  }

  /// Replaces the result limits.
  pub fn with_limits(mut self, limits: Limits) -> Self {
    self.limits = limits;
    self
  }

  /// The feed cache shared by every request.
  pub fn cache(&self) -> &SearchCache { &self.cache }

  /// Year filter applied when a search names none.
  pub fn default_year(&self) -> YearFilter { self.default_year }

  fn adapter(&self, source: PaperSource) -> &dyn PaperAdapter {
    match source {
      PaperSource::Arxiv => &self.arxiv,
      PaperSource::SemanticScholar => &self.semantic_scholar,
    }
  }

  /// Free-text search against `source`, falling back to the other source once.
  ///
  /// Without a year filter the configured default (`2014-`) applies.
  pub async fn search(
    &self,
    query: &str,
    source: PaperSource,
    year: Option<YearFilter>,
  ) -> SearchOutcome {
    let year = year.unwrap_or(self.default_year);
    search_with_fallback(
      self.adapter(source),
      self.adapter(source.other()),
      query,
      Some(&year),
      self.limits.search,
    )
    .await
  }

  /// Builds a feed with one slice per topic, in topic order.
  pub async fn feed<'a>(
    &self,
    kind: FeedKind,
    topics: impl IntoIterator<Item = &'a str>,
    year: Option<YearFilter>,
  ) -> Vec<TopicFeed> {
    let year = year.unwrap_or(self.default_year);
    let mut feeds = Vec::new();
    for topic in topics {
      let result = match kind {
        FeedKind::Trending => self.arxiv.recent(topic, self.limits.trending).await,
        FeedKind::Recent => self.cached_topic(kind, SearchMode::Relevance, topic, &year).await,
        FeedKind::Best => self.cached_topic(kind, SearchMode::Bulk, topic, &year).await,
      };
      feeds.push(match result {
        Ok(papers) => TopicFeed { topic: topic.to_string(), papers, error: None },
        Err(e) => {
          warn!("{kind} feed failed for {topic}: {e}");
          TopicFeed {
            topic:  topic.to_string(),
            papers: Vec::new(),
            error:  Some(format!("Failed to load {kind} papers for: {topic}")),
          }
        },
      });
    }
    feeds
  }

  /// Semantic Scholar results are memoized per topic and year; arXiv fallbacks are not.
  async fn cached_topic(
    &self,
    kind: FeedKind,
    mode: SearchMode,
    topic: &str,
    year: &YearFilter,
  ) -> Result<Vec<ExternalPaper>> {
    let key = SearchCache::key(kind.as_str(), PaperSource::SemanticScholar, topic, year);
    if let Some(papers) = self.cache.get(&key) {
      debug!("Feed cache hit: {key}");
      return Ok(papers);
    }

    match self.semantic_scholar.search(mode, topic, Some(year), self.limits.feed).await {
      Ok(papers) => {
        self.cache.insert(key, papers.clone());
        Ok(papers)
      },
      Err(e) => {
        warn!("Semantic Scholar {kind} feed failed for {topic} ({e}), trying arXiv");
        self.arxiv.fetch_by_query(topic, Some(year), self.limits.feed).await
      },
    }
  }

  /// Papers related to `paper`, looked up with the id format its source uses.
  pub async fn recommendations(&self, paper: &ExternalPaper) -> Result<Vec<ExternalPaper>> {
    self.recommendations_for(&paper.id, paper.source).await
  }

  /// Papers related to the paper with `paper_id` on `source`.
  pub async fn recommendations_for(
    &self,
    paper_id: &str,
    source: PaperSource,
  ) -> Result<Vec<ExternalPaper>> {
    self.semantic_scholar.fetch_recommendations(paper_id, source, self.limits.recommendations).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Both clients point at a closed local port so every request fails fast.
  fn offline() -> Discovery {
    Discovery::new(
      ArxivClient::new().with_base_url("http://127.0.0.1:9/api/query"),
      SemanticScholarClient::new()
        .with_base_url("http://127.0.0.1:9/graph/v1")
        .with_recommendations_url("http://127.0.0.1:9/recommendations/v1"),
    )
  }

  #[test]
  fn test_feed_kind_parse() {
    assert_eq!("Best".parse::<FeedKind>().unwrap(), FeedKind::Best);
    assert!("hot".parse::<FeedKind>().is_err());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_cached_topic_skips_network() {
    let discovery = offline();
    let key = SearchCache::key("recent", PaperSource::SemanticScholar, "nlp", &YearFilter::From(2014));
    discovery.cache().insert(key, Vec::new());

    let feeds = discovery.feed(FeedKind::Recent, ["nlp"], None).await;
    assert_eq!(feeds.len(), 1);
    assert!(feeds[0].error.is_none());
    assert!(logs_contain("Feed cache hit: recent:ss:nlp:2014-"));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_failed_topic_is_isolated() {
    let discovery = offline();
    let key = SearchCache::key("best", PaperSource::SemanticScholar, "cv", &YearFilter::From(2014));
    discovery.cache().insert(key, Vec::new());

    let feeds = discovery.feed(FeedKind::Best, ["nlp", "cv"], None).await;
    assert_eq!(feeds[0].error.as_deref(), Some("Failed to load best papers for: nlp"));
    assert!(feeds[1].error.is_none());
    // the failed lookup must not poison the cache
    assert_eq!(discovery.cache().len(), 1);
  }

  #[tokio::test]
  async fn test_search_reports_no_results() {
    let outcome = offline().search("anything", PaperSource::SemanticScholar, None).await;
    assert!(matches!(outcome, SearchOutcome::NoResults { .. }));
    assert_eq!(outcome.into_result().unwrap_err().to_string(), "No papers found from either source");
  }
}
