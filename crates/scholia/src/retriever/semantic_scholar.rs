//! Client for the Semantic Scholar graph and recommendation APIs.
//!
//! Three endpoints are used:
//!
//! - `GET /graph/v1/paper/search` for relevance-ranked search
//! - `GET /graph/v1/paper/search/bulk` for the "best of" topic feed
//! - `GET /recommendations/v1/papers/forpaper/{id}` for related papers
//!
//! Searches are restricted to Computer Science journal and conference papers and asked for in
//! citation order. Responses are mapped into [`ExternalPaper`] by [`map_search_paper`] and
//! [`map_recommended_paper`].

use serde_json::Value;

use super::*;

/// Root of the graph API.
pub const SEMANTIC_SCHOLAR_API_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Root of the recommendations API.
pub const RECOMMENDATIONS_API_URL: &str = "https://api.semanticscholar.org/recommendations/v1";

/// Fields requested from the search endpoints.
pub const SEARCH_FIELDS: &str = "paperId,title,abstract,authors,year,publicationDate,url,\
                                 openAccessPdf,fieldsOfStudy,citationCount,publicationTypes,\
                                 influentialCitationCount,externalIds";

/// Fields requested from the recommendation endpoint.
pub const RECOMMENDATION_FIELDS: &str = "title,url,abstract,year,venue,authors";

#[derive(Debug, Deserialize)]
struct SearchResponse {
  #[serde(default)]
  data: Vec<SsPaper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationResponse {
  #[serde(default)]
  recommended_papers: Vec<SsPaper>,
}

/// A paper as returned by Semantic Scholar. Every field may be missing or `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsPaper {
  /// Semantic Scholar paper id.
  pub paper_id:                   Option<String>,
  /// Title.
  pub title:                      Option<String>,
  /// Abstract.
  #[serde(rename = "abstract")]
  pub abstract_text:              Option<String>,
  /// Authors in byline order.
  pub authors:                    Option<Vec<SsAuthor>>,
  /// Publication year.
  pub year:                       Option<i32>,
  /// Full publication date, when known.
  pub publication_date:           Option<String>,
  /// Semantic Scholar landing page.
  pub url:                        Option<String>,
  /// An open access PDF.
  pub open_access_pdf:            Option<OpenAccessPdf>,
  /// Fields of study.
  pub fields_of_study:            Option<Vec<String>>,
  /// Citations.
  pub citation_count:             Option<u64>,
  /// Influential citations.
  pub influential_citation_count: Option<u64>,
  /// Publication types.
  pub publication_types:          Option<Vec<String>>,
  /// Venue name.
  pub venue:                      Option<String>,
  /// Values are mostly strings, but `CorpusId` is a number.
  pub external_ids:               Option<BTreeMap<String, Value>>,
}

/// An author entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SsAuthor {
  /// Display name.
  pub name: Option<String>,
}

/// An open access PDF location.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAccessPdf {
  /// The PDF URL.
  pub url: Option<String>,
}

impl SsPaper {
  fn id(&self) -> String { self.paper_id.clone().unwrap_or_default() }

  fn landing_url(&self) -> String {
    self
      .url
      .clone()
      .filter(|url| !url.is_empty())
      .unwrap_or_else(|| format!("https://www.semanticscholar.org/paper/{}", self.id()))
  }

  fn pdf_url(&self) -> Option<String> {
    self.open_access_pdf.as_ref().and_then(|pdf| pdf.url.clone()).filter(|url| !url.is_empty())
  }

  fn author_names(&self) -> Vec<String> {
    self.authors.iter().flatten().filter_map(|author| author.name.clone()).collect()
  }

  fn external_ids(&self) -> BTreeMap<String, String> {
    self
      .external_ids
      .iter()
      .flatten()
      .filter_map(|(key, value)| match value {
        Value::String(s) => Some((key.clone(), s.clone())),
        Value::Number(n) => Some((key.clone(), n.to_string())),
        _ => None,
      })
      .collect()
  }
}

/// Maps a search hit into the shared shape.
///
/// `published` is the publication date, else the year, else empty. The landing page defaults to
/// the paper's Semantic Scholar page.
pub fn map_search_paper(paper: SsPaper) -> ExternalPaper {
  ExternalPaper {
    id:                         paper.id(),
    url:                        paper.landing_url(),
    pdf_url:                    paper.pdf_url(),
    authors:                    paper.author_names(),
    external_ids:               paper.external_ids(),
    published:                  paper
      .publication_date
      .clone()
      .filter(|date| !date.is_empty())
      .or_else(|| paper.year.map(|year| year.to_string()))
      .unwrap_or_default(),
    title:                      paper.title.unwrap_or_default(),
    abstract_text:              paper.abstract_text.unwrap_or_default(),
    fields_of_study:            paper.fields_of_study.unwrap_or_default(),
    citation_count:             paper.citation_count.unwrap_or(0),
    influential_citation_count: paper.influential_citation_count.unwrap_or(0),
    publication_types:          paper.publication_types.unwrap_or_default(),
    venue:                      paper.venue.filter(|venue| !venue.is_empty()),
    source:                     PaperSource::SemanticScholar,
  }
}

/// Maps a recommendation into the shared shape.
///
/// Recommendations only carry a year. A paper with an open access PDF is tagged as coming from
/// arXiv so its PDF is opened directly.
pub fn map_recommended_paper(paper: SsPaper) -> ExternalPaper {
  let source =
    if paper.pdf_url().is_some() { PaperSource::Arxiv } else { PaperSource::SemanticScholar };
  let published = paper.year.map(|year| year.to_string()).unwrap_or_default();
  ExternalPaper { source, published, ..map_search_paper(paper) }
}

/// Sorts most cited first, keeping the source's order among ties.
pub fn sort_by_citations(papers: &mut [ExternalPaper]) {
  papers.sort_by(|a, b| b.citation_count.cmp(&a.citation_count));
}

/// Rewrites a paper id into the form the recommendation endpoint expects.
///
/// arXiv ids get an `arXiv:` prefix and lose any version suffix. Semantic Scholar ids lose a
/// stray `arXiv:` prefix.
pub fn normalize_recommendation_id(paper_id: &str, source: PaperSource) -> String {
  match source {
    PaperSource::Arxiv => {
      let prefixed = if paper_id.starts_with("arXiv:") {
        paper_id.to_string()
      } else {
        format!("arXiv:{paper_id}")
      };
      strip_version(&prefixed).to_string()
    },
    PaperSource::SemanticScholar =>
      paper_id.strip_prefix("arXiv:").unwrap_or(paper_id).to_string(),
  }
}

/// Which search endpoint to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
  Relevance,
  Bulk,
}

impl SearchMode {
  fn path(&self) -> &'static str {
    match self {
      Self::Relevance => "/paper/search",
      Self::Bulk => "/paper/search/bulk",
    }
  }
}

/// Client for the Semantic Scholar APIs.
#[derive(Debug, Clone)]
pub struct SemanticScholarClient {
  client:              reqwest::Client,
  base_url:            String,
  recommendations_url: String,
}

impl Default for SemanticScholarClient {
  fn default() -> Self { Self::new() }
}

impl SemanticScholarClient {
  /// A client for the public API endpoints.
  pub fn new() -> Self {
    Self {
      client:              reqwest::Client::new(),
      base_url:            SEMANTIC_SCHOLAR_API_URL.into(),
      recommendations_url: RECOMMENDATIONS_API_URL.into(),
    }
  }

  /// Points searches at another graph API base URL.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  /// Points recommendations at another base URL.
  pub fn with_recommendations_url(mut self, url: impl Into<String>) -> Self {
    self.recommendations_url = url.into();
    self
  }

  /// Searches one of the graph search endpoints.
  pub async fn search(
    &self,
    mode: SearchMode,
    query: &str,
    year: Option<&YearFilter>,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>> {
    let url = format!("{}{}", self.base_url, mode.path());
    let limit = limit.to_string();
    let mut params = vec![
      ("query", query.to_string()),
      ("limit", limit),
      ("fields", SEARCH_FIELDS.to_string()),
      ("fieldsOfStudy", "Computer Science".to_string()),
      ("publicationTypes", "JournalArticle,Conference".to_string()),
      ("sort", "citationCount:desc".to_string()),
    ];
    if let Some(year) = year {
      params.push(("year", year.to_string()));
    }

    debug!("Fetching from Semantic Scholar ({mode:?}): {query}");
    let response = self.client.get(&url).query(&params).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(ScholiaError::ApiError(format!(
        "Semantic Scholar API error: {}",
        status.as_u16()
      )));
    }

    let body: SearchResponse = response.json().await?;
    trace!("Semantic Scholar returned {} papers", body.data.len());
    let mut papers: Vec<ExternalPaper> = body.data.into_iter().map(map_search_paper).collect();
    sort_by_citations(&mut papers);
    Ok(papers)
  }

  /// The URL the recommendation endpoint is called with.
  pub fn recommendations_endpoint(&self, paper_id: &str, source: PaperSource, limit: usize) -> String {
    format!(
      "{}/papers/forpaper/{}?fields={RECOMMENDATION_FIELDS}&limit={limit}",
      self.recommendations_url,
      normalize_recommendation_id(paper_id, source)
    )
  }

  async fn recommendations(&self, url: &str) -> Result<Vec<ExternalPaper>> {
    let response = self.client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(ScholiaError::ApiError(format!(
        "Semantic Scholar API error: {}",
        status.as_u16()
      )));
    }
    let body: RecommendationResponse = response.json().await?;
    if body.recommended_papers.is_empty() {
      return Err(ScholiaError::ApiError("No recommendations found".into()));
    }
    Ok(body.recommended_papers.into_iter().map(map_recommended_paper).collect())
  }
}

#[async_trait]
impl PaperAdapter for SemanticScholarClient {
  fn source(&self) -> PaperSource { PaperSource::SemanticScholar }

  async fn fetch_by_query(
    &self,
    query: &str,
    year: Option<&YearFilter>,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>> {
    self.search(SearchMode::Relevance, query, year, limit).await
  }

  /// Every failure, including an empty list, is reported with the URL that was tried.
  async fn fetch_recommendations(
    &self,
    paper_id: &str,
    source: PaperSource,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>> {
    let url = self.recommendations_endpoint(paper_id, source, limit);
    debug!("Fetching recommendations: {url}");
    self.recommendations(&url).await.map_err(|e| {
      let message = match e {
        ScholiaError::ApiError(message) => message,
        other => other.to_string(),
      };
      ScholiaError::ApiError(format!(
        "Failed to fetch recommendations: {message} (URL: {url})"
      ))
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SEARCH: &str = r#"{
    "total": 2,
    "data": [
      {
        "paperId": "abc",
        "title": "Low Cited",
        "abstract": null,
        "authors": [{"authorId": "1", "name": "Ada"}],
        "year": 2019,
        "publicationDate": null,
        "url": null,
        "openAccessPdf": null,
        "fieldsOfStudy": null,
        "citationCount": 3,
        "influentialCitationCount": null,
        "publicationTypes": ["JournalArticle"],
        "externalIds": {"DOI": "10.1/x", "CorpusId": 42}
      },
      {
        "paperId": "def",
        "title": "Highly Cited",
        "abstract": "A classic.",
        "authors": [],
        "year": 2017,
        "publicationDate": "2017-06-12",
        "url": "https://www.semanticscholar.org/paper/def",
        "openAccessPdf": {"url": "https://arxiv.org/pdf/1706.03762", "status": "GREEN"},
        "fieldsOfStudy": ["Computer Science"],
        "citationCount": 90000,
        "influentialCitationCount": 9000,
        "publicationTypes": ["Conference"],
        "venue": "NeurIPS",
        "externalIds": {"ArXiv": "1706.03762"}
      }
    ]
  }"#;

  #[test]
  fn test_map_search_defaults() {
    let body: SearchResponse = serde_json::from_str(SEARCH).unwrap();
    let mut papers: Vec<_> = body.data.into_iter().map(map_search_paper).collect();

    let low = &papers[0];
    assert_eq!(low.url, "https://www.semanticscholar.org/paper/abc");
    assert_eq!(low.published, "2019");
    assert_eq!(low.abstract_text, "");
    assert_eq!(low.pdf_url, None);
    assert_eq!(low.influential_citation_count, 0);
    assert_eq!(low.external_ids.get("CorpusId").map(String::as_str), Some("42"));
    assert_eq!(low.source, PaperSource::SemanticScholar);

    sort_by_citations(&mut papers);
    assert_eq!(papers[0].title, "Highly Cited");
    assert_eq!(papers[0].published, "2017-06-12");
    assert_eq!(papers[0].pdf_url.as_deref(), Some("https://arxiv.org/pdf/1706.03762"));
    assert_eq!(papers[0].venue.as_deref(), Some("NeurIPS"));
  }

  #[test]
  fn test_map_recommendation_source() {
    let body: RecommendationResponse = serde_json::from_str(
      r#"{"recommendedPapers": [
        {"paperId": "p1", "title": "Open", "year": 2021, "openAccessPdf": {"url": "https://x/p1.pdf"}},
        {"paperId": "p2", "title": "Closed", "year": null, "authors": null}
      ]}"#,
    )
    .unwrap();
    let papers: Vec<_> = body.recommended_papers.into_iter().map(map_recommended_paper).collect();
    assert_eq!(papers[0].source, PaperSource::Arxiv);
    assert_eq!(papers[0].published, "2021");
    assert_eq!(papers[1].source, PaperSource::SemanticScholar);
    assert_eq!(papers[1].published, "");
    assert!(papers[1].authors.is_empty());
  }

  #[test]
  fn test_normalize_recommendation_id() {
    assert_eq!(normalize_recommendation_id("2301.00001v2", PaperSource::Arxiv), "arXiv:2301.00001");
    assert_eq!(normalize_recommendation_id("arXiv:2301.00001", PaperSource::Arxiv), "arXiv:2301.00001");
    assert_eq!(
      normalize_recommendation_id("arXiv:2301.00001", PaperSource::SemanticScholar),
      "2301.00001"
    );
    assert_eq!(normalize_recommendation_id("649def34", PaperSource::SemanticScholar), "649def34");
  }

  #[test]
  fn test_recommendations_endpoint() {
    let client = SemanticScholarClient::new();
    assert_eq!(
      client.recommendations_endpoint("2301.00001v1", PaperSource::Arxiv, 12),
      "https://api.semanticscholar.org/recommendations/v1/papers/forpaper/arXiv:2301.00001?fields=title,url,abstract,year,venue,authors&limit=12"
    );
  }

  #[tokio::test]
  async fn test_recommendation_error_embeds_url() {
    // nothing listens on port 9, so the request fails before any response
    let client = SemanticScholarClient::new().with_recommendations_url("http://127.0.0.1:9");
    let err = client.fetch_recommendations("abc", PaperSource::SemanticScholar, 12).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("API error: Failed to fetch recommendations: "));
    assert!(message.ends_with(
      "(URL: http://127.0.0.1:9/papers/forpaper/abc?fields=title,url,abstract,year,venue,authors&limit=12)"
    ));
  }

  #[ignore = "Hits the live Semantic Scholar API."]
  #[tokio::test]
  async fn test_live_search() {
    let papers =
      SemanticScholarClient::new().fetch_by_query("transformers", None, 5).await.unwrap();
    assert!(papers.windows(2).all(|w| w[0].citation_count >= w[1].citation_count));
  }
}
