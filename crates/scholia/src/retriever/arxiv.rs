//! Client for the arXiv Atom query API.
//!
//! Searches go to `https://export.arxiv.org/api/query` with an `all:` query, optionally
//! narrowed by a `submittedDate` range, sorted by relevance. Results are Atom XML which is
//! deserialized with `quick-xml` and mapped by [`parse_feed`].
//!
//! arXiv has no citation data, so every result reports zero citations, `preprint` as its only
//! publication type and `arXiv` as its venue.

use chrono::{Duration, NaiveDate};
use quick_xml::de::from_str;

use super::*;

/// Public arXiv query endpoint.
pub const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";

/// Atom feed wrapper. Feed-level metadata is ignored.
#[derive(Debug, Deserialize)]
struct Feed {
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
  #[serde(default)]
  id:         String,
  #[serde(default)]
  title:      String,
  #[serde(default)]
  summary:    String,
  #[serde(default)]
  published:  String,
  #[serde(default)]
  updated:    String,
  #[serde(rename = "author", default)]
  authors:    Vec<Author>,
  #[serde(rename = "category", default)]
  categories: Vec<Category>,
  #[serde(rename = "link", default)]
  links:      Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct Author {
  #[serde(default)]
  name: String,
}

#[derive(Debug, Deserialize)]
struct Category {
  #[serde(rename = "@term", default)]
  term: String,
}

#[derive(Debug, Deserialize)]
struct Link {
  #[serde(rename = "@href", default)]
  href:      String,
  #[serde(rename = "@type")]
  mime_type: Option<String>,
}

/// One arXiv feed entry with its text cleaned up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivEntry {
  /// Bare arXiv id, e.g. `2301.00001v1`.
  pub id:               String,
  /// Title with whitespace collapsed.
  pub title:            String,
  /// Author names.
  pub authors:          Vec<String>,
  /// Summary with whitespace collapsed.
  pub abstract_text:    String,
  /// First submission timestamp.
  pub published:        String,
  /// Latest revision timestamp.
  pub updated:          String,
  /// Abstract page.
  pub url:              String,
  /// PDF link, taken from the feed or derived from the id.
  pub pdf_url:          String,
  /// Every arXiv category.
  pub categories:       Vec<String>,
  /// The primary category, when the feed names one.
  pub primary_category: Option<String>,
}

impl From<ArxivEntry> for ExternalPaper {
  fn from(entry: ArxivEntry) -> Self {
    let mut external_ids = BTreeMap::new();
    external_ids.insert("ArXiv".to_string(), strip_version(&entry.id).to_string());
    ExternalPaper {
      id: entry.id,
      title: entry.title,
      authors: entry.authors,
      abstract_text: entry.abstract_text,
      published: entry.published,
      url: entry.url,
      pdf_url: Some(entry.pdf_url),
      fields_of_study: entry.categories,
      citation_count: 0,
      influential_citation_count: 0,
      publication_types: vec!["preprint".to_string()],
      venue: Some("arXiv".to_string()),
      source: PaperSource::Arxiv,
      external_ids,
    }
  }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
fn collapse_whitespace(text: &str) -> String { text.split_whitespace().collect::<Vec<_>>().join(" ") }

/// Parses an arXiv Atom response into cleaned entries.
///
/// - the `http://arxiv.org/abs/` prefix is stripped from ids
/// - titles and abstracts have their whitespace collapsed
/// - the first category is the primary one
/// - the PDF link is the `type="application/pdf"` link, defaulting to
///   `http://arxiv.org/pdf/{id}.pdf`
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivEntry>> {
  let feed: Feed =
    from_str(xml).map_err(|e| ScholiaError::ApiError(format!("Failed to parse XML: {e}")))?;

  Ok(
    feed
      .entries
      .into_iter()
      .map(|entry| {
        let id = entry.id.trim().replace("http://arxiv.org/abs/", "");
        let categories: Vec<String> = entry
          .categories
          .into_iter()
          .map(|category| category.term)
          .filter(|term| !term.is_empty())
          .collect();
        let pdf_url = entry
          .links
          .iter()
          .filter(|link| link.mime_type.as_deref() == Some("application/pdf"))
          .map(|link| link.href.clone())
          .last()
          .filter(|href| !href.is_empty())
          .unwrap_or_else(|| format!("http://arxiv.org/pdf/{id}.pdf"));

        ArxivEntry {
          title: collapse_whitespace(&entry.title),
          abstract_text: collapse_whitespace(&entry.summary),
          authors: entry
            .authors
            .into_iter()
            .map(|author| author.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
          published: entry.published.trim().to_string(),
          updated: entry.updated.trim().to_string(),
          url: format!("https://arxiv.org/abs/{id}"),
          pdf_url,
          primary_category: categories.first().cloned(),
          categories,
          id,
        }
      })
      .collect(),
  )
}

/// Builds the `search_query` parameter for a text search.
pub fn search_query(query: &str, year: Option<&YearFilter>, current_year: i32) -> String {
  let mut search = format!("all:{query}");
  if let Some(year) = year {
    search.push_str(&year.arxiv_clause(current_year));
  }
  search
}

/// Builds the `search_query` parameter for papers submitted between three days and one day
/// before `today`.
pub fn recent_days_query(topic: &str, today: NaiveDate) -> String {
  let start = (today - Duration::days(3)).format("%Y%m%d");
  let end = (today - Duration::days(1)).format("%Y%m%d");
  format!("all:{topic} AND submittedDate:[{start}000000 TO {end}235959]")
}

/// Client for the arXiv query API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  base_url: String,
}

impl Default for ArxivClient {
  fn default() -> Self { Self::new() }
}

impl ArxivClient {
  /// A client for the public arXiv API.
  pub fn new() -> Self { Self { client: reqwest::Client::new(), base_url: ARXIV_API_URL.into() } }

  /// Points the client at a different query endpoint.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into();
    self
  }

  async fn query(&self, search_query: &str, limit: usize) -> Result<Vec<ExternalPaper>> {
    debug!("Fetching from arXiv: {search_query}");

    let max_results = limit.to_string();
    let response = self
      .client
      .get(&self.base_url)
      .query(&[
        ("search_query", search_query),
        ("start", "0"),
        ("max_results", max_results.as_str()),
        ("sortBy", "relevance"),
        ("sortOrder", "descending"),
      ])
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      return Err(ScholiaError::ApiError(format!("ArXiv API error: {}", status.as_u16())));
    }

    let xml = response.text().await?;
    trace!("arXiv response: {} bytes", xml.len());
    Ok(parse_feed(&xml)?.into_iter().map(ExternalPaper::from).collect())
  }

  /// Papers on `topic` submitted in the last few days, for the trending feed.
  pub async fn recent(&self, topic: &str, limit: usize) -> Result<Vec<ExternalPaper>> {
    self.query(&recent_days_query(topic, Utc::now().date_naive()), limit).await
  }
}

#[async_trait]
impl PaperAdapter for ArxivClient {
  fn source(&self) -> PaperSource { PaperSource::Arxiv }

  async fn fetch_by_query(
    &self,
    query: &str,
    year: Option<&YearFilter>,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>> {
    self.query(&search_query(query, year, current_year()), limit).await
  }

  /// arXiv has no recommendation endpoint; Semantic Scholar answers for arXiv ids too.
  async fn fetch_recommendations(
    &self,
    paper_id: &str,
    source: PaperSource,
    limit: usize,
  ) -> Result<Vec<ExternalPaper>> {
    SemanticScholarClient::new().fetch_recommendations(paper_id, source, limit).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=all:sparse</title>
  <id>http://arxiv.org/api/abc</id>
  <updated>2023-01-03T00:00:00-05:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">2</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/2301.00001v1</id>
    <updated>2023-01-01T10:00:00Z</updated>
    <published>2023-01-01T10:00:00Z</published>
    <title>Sparse   Attention
      Revisited</title>
    <summary>  We revisit
   sparse attention.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name> Grace Hopper </name></author>
    <link href="http://arxiv.org/abs/2301.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2301.00001v1" rel="related" type="application/pdf"/>
    <arxiv:primary_category xmlns:arxiv="http://arxiv.org/schemas/atom" term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.LG" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2301.00001</id>
    <updated>2023-01-02T10:00:00Z</updated>
    <published>2023-01-02T10:00:00Z</published>
    <title>No Pdf Link</title>
    <summary>Nothing to see.</summary>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/2301.00001" rel="alternate" type="text/html"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
</feed>"#;

  #[test]
  fn test_parse_feed() {
    let entries = parse_feed(FEED).unwrap();
    assert_eq!(entries.len(), 2);

    let first = &entries[0];
    assert_eq!(first.id, "2301.00001v1");
    assert_eq!(first.title, "Sparse Attention Revisited");
    assert_eq!(first.abstract_text, "We revisit sparse attention.");
    assert_eq!(first.authors, vec!["Ada Lovelace", "Grace Hopper"]);
    assert_eq!(first.categories, vec!["cs.LG", "cs.CL"]);
    assert_eq!(first.primary_category.as_deref(), Some("cs.LG"));
    assert_eq!(first.pdf_url, "http://arxiv.org/pdf/2301.00001v1");
    assert_eq!(first.url, "https://arxiv.org/abs/2301.00001v1");
  }

  #[test]
  fn test_missing_pdf_link_defaults() {
    let entries = parse_feed(FEED).unwrap();
    let paper = ExternalPaper::from(entries[1].clone());
    assert_eq!(paper.id, "2301.00001");
    assert_eq!(paper.pdf_url.as_deref(), Some("http://arxiv.org/pdf/2301.00001.pdf"));
    assert_eq!(paper.citation_count, 0);
    assert_eq!(paper.publication_types, vec!["preprint"]);
    assert_eq!(paper.venue.as_deref(), Some("arXiv"));
    assert_eq!(paper.source, PaperSource::Arxiv);
    assert_eq!(paper.external_ids.get("ArXiv").map(String::as_str), Some("2301.00001"));
  }

  #[test]
  fn test_empty_feed() {
    let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
    assert!(parse_feed(xml).unwrap().is_empty());
  }

  #[test]
  fn test_query_strings() {
    assert_eq!(search_query("gnn", None, 2025), "all:gnn");
    assert_eq!(
      search_query("gnn", Some(&YearFilter::From(2014)), 2025),
      "all:gnn AND submittedDate:[201401010000 TO 202512312359]"
    );

    let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
    assert_eq!(
      recent_days_query("robotics", today),
      "all:robotics AND submittedDate:[20240228000000 TO 20240301235959]"
    );
  }

  #[ignore = "Hits the live arXiv API."]
  #[tokio::test]
  async fn test_live_search() {
    let papers = ArxivClient::new().fetch_by_query("attention is all you need", None, 3).await.unwrap();
    assert!(!papers.is_empty());
  }
}
