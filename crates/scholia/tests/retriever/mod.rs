use std::sync::Mutex;

use async_trait::async_trait;
use scholia::retriever::{
  arxiv::ArxivClient,
  discovery::{FeedKind, Limits},
  search_with_fallback,
  semantic_scholar::SemanticScholarClient,
  Discovery, SearchOutcome, YearFilter,
};

use super::*;

/// Answers every search with one canned paper, or fails, and remembers what it was asked.
struct Canned {
  source:  PaperSource,
  papers:  Option<Vec<ExternalPaper>>,
  queries: Mutex<Vec<String>>,
}

impl Canned {
  fn answering(source: PaperSource, id: &str) -> Self {
    let mut paper = create_test_external(id);
    paper.source = source;
    Self { source, papers: Some(vec![paper]), queries: Mutex::new(Vec::new()) }
  }

  fn failing(source: PaperSource) -> Self { Self { source, papers: None, queries: Mutex::new(Vec::new()) } }

  fn queries(&self) -> Vec<String> { self.queries.lock().unwrap().clone() }
}

#[async_trait]
impl PaperAdapter for Canned {
  fn source(&self) -> PaperSource { self.source }

  async fn fetch_by_query(
    &self,
    query: &str,
    _year: Option<&YearFilter>,
    _limit: usize,
  ) -> scholia::error::Result<Vec<ExternalPaper>> {
    self.queries.lock().unwrap().push(query.to_string());
    self.papers.clone().ok_or_else(|| ScholiaError::ApiError(format!("{} unavailable", self.source)))
  }

  async fn fetch_recommendations(
    &self,
    _paper_id: &str,
    _source: PaperSource,
    _limit: usize,
  ) -> scholia::error::Result<Vec<ExternalPaper>> {
    Ok(Vec::new())
  }
}

fn offline_discovery() -> Discovery {
  Discovery::new(
    ArxivClient::new().with_base_url("http://127.0.0.1:9"),
    SemanticScholarClient::new()
      .with_base_url("http://127.0.0.1:9")
      .with_recommendations_url("http://127.0.0.1:9"),
  )
}

#[traced_test]
#[tokio::test]
async fn test_arxiv_failure_falls_back_with_raw_query() {
  let arxiv = Canned::failing(PaperSource::Arxiv);
  let ss = Canned::answering(PaperSource::SemanticScholar, "ss-1");
  let query = "https://arxiv.org/abs/2301.07041v2";

  let outcome = search_with_fallback(&arxiv, &ss, query, None, 20).await;
  assert!(outcome.used_fallback());
  assert_eq!(outcome.papers()[0].id, "ss-1");
  assert_eq!(arxiv.queries(), vec!["2301.07041"]);
  assert_eq!(ss.queries(), vec![query]);
}

#[traced_test]
#[tokio::test]
async fn test_primary_success_never_touches_fallback() {
  let ss = Canned::answering(PaperSource::SemanticScholar, "ss-1");
  let arxiv = Canned::answering(PaperSource::Arxiv, "2301.07041");

  let outcome = search_with_fallback(&ss, &arxiv, "fhe", None, 20).await;
  assert!(matches!(outcome, SearchOutcome::Primary(_)));
  assert!(arxiv.queries().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_both_sources_failing() {
  let ss = Canned::failing(PaperSource::SemanticScholar);
  let arxiv = Canned::failing(PaperSource::Arxiv);

  let outcome = search_with_fallback(&ss, &arxiv, "fhe", None, 20).await;
  assert!(outcome.papers().is_empty());
  let err = outcome.into_result().unwrap_err();
  assert_eq!(err.to_string(), "No papers found from either source");
  assert_eq!(ss.queries().len(), 1);
  assert_eq!(arxiv.queries().len(), 1);
}

#[traced_test]
#[tokio::test]
async fn test_feed_failures_are_per_topic() {
  let discovery = offline_discovery().with_limits(Limits { trending: 3, ..Limits::default() });
  let feeds = discovery.feed(FeedKind::Trending, ["graphs", "cryptography"], None).await;

  assert_eq!(feeds.iter().map(|f| f.topic.as_str()).collect::<Vec<_>>(), vec!["graphs", "cryptography"]);
  assert!(feeds.iter().all(|f| f.papers.is_empty()));
  assert_eq!(feeds[1].error.as_deref(), Some("Failed to load trending papers for: cryptography"));
  // trending comes straight from arXiv and is never cached
  assert!(discovery.cache().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_profile_topics_drive_feeds() {
  let profile = Profile::new("ada", "Ada").with_topics(["nlp", "  ", "vision"]);
  let discovery = offline_discovery();
  let feeds = discovery.feed(FeedKind::Recent, profile.feed_topics(), Some(YearFilter::Single(2020))).await;
  assert_eq!(feeds.len(), 2);
  assert!(feeds.iter().all(|f| f.error.is_some()));
}

#[ignore = "Hits the live Semantic Scholar and arXiv APIs."]
#[traced_test]
#[tokio::test]
async fn test_live_search() -> TestResult<()> {
  let discovery = Discovery::default();
  let outcome = discovery
    .search("attention is all you need", PaperSource::SemanticScholar, Some("2017".parse()?))
    .await;
  let papers = outcome.into_result()?;
  assert!(!papers.is_empty());
  assert!(papers.windows(2).all(|w| w[0].citation_count >= w[1].citation_count));
  Ok(())
}

#[ignore = "Hits the live Semantic Scholar API."]
#[traced_test]
#[tokio::test]
async fn test_live_recommendations() -> TestResult<()> {
  let discovery = Discovery::default();
  let mut paper = create_test_external("2301.07041");
  paper.source = PaperSource::Arxiv;
  let related = discovery.recommendations(&paper).await?;
  assert!(related.len() <= Limits::default().recommendations);
  Ok(())
}
