//! Client for the PDF resolution, ingestion and chat service.
//!
//! The service exposes three endpoints:
//!
//! - `POST /resolve-pdf` turns a landing page URL into a direct PDF link
//! - `POST /process-pdf` downloads, chunks and embeds a PDF for later questions
//! - `POST /chat-with-ai` answers a question about a paper as a streamed plain-text body
//!
//! A [`ChatSession`] holds the conversation for one paper and enforces the question cap.
//!
//! ```no_run
//! use scholia::assistant::{AssistantClient, ChatSession};
//!
//! # async fn example() -> scholia::error::Result<()> {
//! let client = AssistantClient::new();
//! let mut chat = ChatSession::new(&client, "Attention Is All You Need", "");
//! chat.ask("What is the main contribution?", |chunk| print!("{chunk}")).await?;
//! # Ok(())
//! # }
//! ```

use futures::StreamExt;

use super::*;
use crate::external::{pdf_link_from_external_ids, ExternalPaper, PdfLink};

/// Where the service runs unless configured otherwise.
pub const ASSISTANT_SERVICE_URL: &str = "http://localhost:8000";

/// Questions allowed per paper.
pub const MAX_QUESTIONS: usize = 5;

/// Appended as the assistant's turn when a question could not be answered.
pub const CHAT_ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

const NO_ABSTRACT: &str = "No abstract available";

/// Answer from `/resolve-pdf`. Every field is absent when nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfResolution {
  /// The direct PDF link.
  pub pdf_link:    Option<String>,
  /// Machine name of the source that had it.
  pub source:      Option<String>,
  /// Human-readable name of that source.
  pub source_name: Option<String>,
}

/// What opening a paper leads to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperTarget {
  /// A direct PDF, either derived from external ids or resolved by the service.
  Pdf(PdfLink),
  /// No PDF could be found; the landing page is all there is.
  Landing(String),
}

/// Summary returned by `/process-pdf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfIngestion {
  /// Pages in the document.
  pub total_pages:     usize,
  /// Pages that were read.
  pub processed_pages: usize,
  /// Text chunks stored for retrieval.
  pub chunks_created:  usize,
  /// Pages skipped on request.
  #[serde(default)]
  pub ignored_pages:   Option<usize>,
  /// Key the service cached the ingestion under.
  #[serde(default)]
  pub cache_key:       Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
  detail: Option<String>,
}

/// Pages to leave out when ingesting a PDF, written the way a reader types them.
///
/// `none` (or nothing) keeps every page, `all` drops every page, and anything else is a comma
/// separated list of one-based pages and ranges such as `1-3, 7`. Parts that don't parse, and
/// pages or ranges that start at zero, are skipped rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnorePages {
  /// Keep every page.
  None,
  /// Skip every page.
  All,
  /// One-based inclusive page ranges to skip.
  Pages(Vec<(usize, usize)>),
}

impl IgnorePages {
  /// Zero-based indices of the ignored pages in a document of `total_pages` pages.
  pub fn resolve(&self, total_pages: usize) -> BTreeSet<usize> {
    match self {
      Self::None => BTreeSet::new(),
      Self::All => (0..total_pages).collect(),
      Self::Pages(spans) => spans
        .iter()
        .flat_map(|&(start, end)| start..=end.min(total_pages))
        .map(|page| page - 1)
        .collect(),
    }
  }
}

impl FromStr for IgnorePages {
  type Err = ScholiaError;

  fn from_str(s: &str) -> Result<Self> {
    let input = s.trim().to_lowercase();
    match input.as_str() {
      "" | "none" => return Ok(Self::None),
      "all" => return Ok(Self::All),
      _ => {},
    }

    let spans = input
      .split(',')
      .map(str::trim)
      .filter(|part| !part.is_empty())
      .filter_map(|part| match part.split_once('-') {
        Some((start, end)) => {
          let (start, end) = (start.trim().parse::<usize>().ok()?, end.trim().parse::<usize>().ok()?);
          (start > 0 && end > 0).then_some((start, end))
        },
        None => part.parse::<usize>().ok().filter(|&page| page > 0).map(|page| (page, page)),
      })
      .collect();
    Ok(Self::Pages(spans))
  }
}

impl Display for IgnorePages {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::None => f.write_str("none"),
      Self::All => f.write_str("all"),
      Self::Pages(spans) => {
        let parts: Vec<String> = spans
          .iter()
          .map(|&(start, end)| if start == end { start.to_string() } else { format!("{start}-{end}") })
          .collect();
        f.write_str(&parts.join(","))
      },
    }
  }
}

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  /// The person asking.
  User,
  /// The service answering.
  Assistant,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  /// Who spoke.
  pub role:    Role,
  /// What was said.
  pub content: String,
}

/// Body of a `/chat-with-ai` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
  /// Title of the paper being discussed.
  pub paper_title:    String,
  /// Its abstract, or a placeholder when there is none.
  pub paper_abstract: String,
  /// The conversation so far, ending with the new question.
  pub messages:       Vec<ChatMessage>,
  /// A PDF already ingested for this paper, so answers can use its full text.
  pub pdf_url:        Option<String>,
}

/// Anything that can answer a chat request as a stream of text chunks.
#[async_trait]
pub trait ChatBackend: Send + Sync {
  /// Sends `request` and hands every decoded chunk to `on_chunk` as it arrives.
  async fn stream_reply(
    &self,
    request: &ChatRequest,
    on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
  ) -> Result<()>;
}

/// HTTP client for the service.
#[derive(Debug, Clone)]
pub struct AssistantClient {
  client:   reqwest::Client,
  base_url: String,
}

impl Default for AssistantClient {
  fn default() -> Self { Self::new() }
}

impl AssistantClient {
  /// A client for the default service address.
  pub fn new() -> Self { Self { client: reqwest::Client::new(), base_url: ASSISTANT_SERVICE_URL.into() } }

  /// Points the client at another service address.
  pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
    self.base_url = base_url.into().trim_end_matches('/').to_string();
    self
  }

  fn endpoint(&self, path: &str) -> String { format!("{}{path}", self.base_url) }

  /// Asks the service for a direct PDF link. Failures are logged and read as "nothing found".
  pub async fn resolve_pdf(&self, url: &str) -> PdfResolution {
    match self.try_resolve_pdf(url).await {
      Ok(resolution) => resolution,
      Err(e) => {
        warn!("PDF resolution failed for {url}: {e}");
        PdfResolution::default()
      },
    }
  }

  async fn try_resolve_pdf(&self, url: &str) -> Result<PdfResolution> {
    debug!("Resolving PDF for {url}");
    let response = self
      .client
      .post(self.endpoint("/resolve-pdf"))
      .json(&serde_json::json!({ "url": url }))
      .send()
      .await?;
    let status = response.status();
    if !status.is_success() {
      return Err(ScholiaError::Service(format!("HTTP error! status: {}", status.as_u16())));
    }
    Ok(response.json().await?)
  }

  /// Finds something to open for `paper`.
  ///
  /// Well-known external ids give a PDF link without any request. Otherwise the service is asked
  /// to resolve the landing page, and the landing page itself is the last resort.
  pub async fn open_paper(&self, paper: &ExternalPaper) -> PaperTarget {
    if let Some(link) = pdf_link_from_external_ids(&paper.external_ids) {
      return PaperTarget::Pdf(link);
    }

    let resolution = self.resolve_pdf(&paper.url).await;
    match resolution.pdf_link {
      Some(url) => PaperTarget::Pdf(PdfLink {
        url,
        source_name: resolution.source_name.unwrap_or_else(|| "Unknown source".into()),
      }),
      None => PaperTarget::Landing(paper.url.clone()),
    }
  }

  /// Ingests a PDF so later questions can use its full text.
  pub async fn process_pdf(&self, pdf_url: &str, ignore_pages: &IgnorePages) -> Result<PdfIngestion> {
    debug!("Processing PDF {pdf_url} (ignoring {ignore_pages})");
    let response = self
      .client
      .post(self.endpoint("/process-pdf"))
      .json(&serde_json::json!({ "pdf_url": pdf_url, "ignore_pages": ignore_pages.to_string() }))
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
      let detail = serde_json::from_str::<ServiceError>(&body).ok().and_then(|e| e.detail);
      return Err(ScholiaError::Service(detail.unwrap_or_else(|| "PDF processing failed".into())));
    }
    trace!("Process response: {} bytes", body.len());
    Ok(serde_json::from_str(&body)?)
  }
}

#[async_trait]
impl ChatBackend for AssistantClient {
  async fn stream_reply(
    &self,
    request: &ChatRequest,
    on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
  ) -> Result<()> {
    let response = self.client.post(self.endpoint("/chat-with-ai")).json(request).send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(ScholiaError::Service(format!(
        "Failed to get AI response (status {})",
        status.as_u16()
      )));
    }

    // chunks may split a multi-byte character, so undecoded bytes carry over
    let mut pending: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(bytes) = stream.next().await {
      pending.extend_from_slice(&bytes?);
      let valid = match std::str::from_utf8(&pending) {
        Ok(text) => text.len(),
        Err(e) => e.valid_up_to(),
      };
      if valid > 0 {
        on_chunk(&String::from_utf8_lossy(&pending[..valid]));
        pending.drain(..valid);
      }
    }
    if !pending.is_empty() {
      on_chunk(&String::from_utf8_lossy(&pending));
    }
    Ok(())
  }
}

/// A conversation about one paper, capped at [`MAX_QUESTIONS`] questions.
///
/// Nothing is persisted; dropping the session forgets the conversation.
pub struct ChatSession<'a, B: ChatBackend + ?Sized> {
  backend:        &'a B,
  paper_title:    String,
  paper_abstract: String,
  pdf_url:        Option<String>,
  messages:       Vec<ChatMessage>,
  asked:          usize,
}

impl<'a, B: ChatBackend + ?Sized> ChatSession<'a, B> {
  /// Starts an empty conversation. A blank abstract is replaced by a placeholder.
  pub fn new(backend: &'a B, title: impl Into<String>, abstract_text: impl Into<String>) -> Self {
    let abstract_text = abstract_text.into();
    Self {
      backend,
      paper_title: title.into(),
      paper_abstract: if abstract_text.trim().is_empty() { NO_ABSTRACT.into() } else { abstract_text },
      pdf_url: None,
      messages: Vec::new(),
      asked: 0,
    }
  }

  /// Answers later questions from the full text of `pdf_url`, which must have been processed.
  pub fn use_processed_pdf(&mut self, pdf_url: impl Into<String>) { self.pdf_url = Some(pdf_url.into()); }

  /// Every turn so far, answers included.
  pub fn messages(&self) -> &[ChatMessage] { &self.messages }

  /// Questions left before the cap.
  pub fn remaining(&self) -> usize { MAX_QUESTIONS.saturating_sub(self.asked) }

  /// Asks a question and streams the answer into the conversation.
  ///
  /// The question counts against the cap as soon as it is sent, even if answering fails. A
  /// failed answer becomes [`CHAT_ERROR_REPLY`] rather than an error.
  pub async fn ask(
    &mut self,
    question: &str,
    mut on_chunk: impl FnMut(&str) + Send,
  ) -> Result<&ChatMessage> {
    if question.trim().is_empty() {
      return Err(ScholiaError::Validation("Please enter a question".into()));
    }
    if self.asked >= MAX_QUESTIONS {
      return Err(ScholiaError::ChatLimitReached(MAX_QUESTIONS));
    }

    self.messages.push(ChatMessage { role: Role::User, content: question.to_string() });
    self.asked += 1;

    let request = ChatRequest {
      paper_title:    self.paper_title.clone(),
      paper_abstract: self.paper_abstract.clone(),
      messages:       self.messages.clone(),
      pdf_url:        self.pdf_url.clone(),
    };

    let Self { backend, messages, .. } = self;
    let mut append = |chunk: &str| {
      match messages.last_mut() {
        Some(last) if last.role == Role::Assistant => last.content.push_str(chunk),
        _ => messages.push(ChatMessage { role: Role::Assistant, content: chunk.to_string() }),
      }
      on_chunk(chunk);
    };

    if let Err(e) = backend.stream_reply(&request, &mut append).await {
      warn!("Chat request failed: {e}");
      self.messages.push(ChatMessage { role: Role::Assistant, content: CHAT_ERROR_REPLY.into() });
    } else if self.messages.last().map(|m| m.role) != Some(Role::Assistant) {
      self.messages.push(ChatMessage { role: Role::Assistant, content: String::new() });
    }

    self.messages.last().ok_or_else(|| ScholiaError::Service("Empty conversation".into()))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use super::*;

  /// Replies with canned chunks, or fails once it has been asked `fail_after` times.
  struct Scripted {
    chunks:     Vec<&'static str>,
    fail_after: Option<usize>,
    requests:   Mutex<Vec<ChatRequest>>,
  }

  impl Scripted {
    fn new(chunks: Vec<&'static str>) -> Self { Self { chunks, fail_after: None, requests: Mutex::new(Vec::new()) } }
  }

  #[async_trait]
  impl ChatBackend for Scripted {
    async fn stream_reply(
      &self,
      request: &ChatRequest,
      on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> Result<()> {
      let mut requests = self.requests.lock().unwrap();
      requests.push(request.clone());
      if self.fail_after.is_some_and(|n| requests.len() > n) {
        return Err(ScholiaError::Service("down".into()));
      }
      for chunk in &self.chunks {
        on_chunk(chunk);
      }
      Ok(())
    }
  }

  #[test]
  fn test_ignore_pages_parse() {
    assert_eq!("".parse::<IgnorePages>().unwrap(), IgnorePages::None);
    assert_eq!(" None ".parse::<IgnorePages>().unwrap(), IgnorePages::None);
    assert_eq!("ALL".parse::<IgnorePages>().unwrap().resolve(3), BTreeSet::from([0, 1, 2]));

    let pages: IgnorePages = "1-3, 7, x, 0, 0-2, 9-".parse().unwrap();
    assert_eq!(pages, IgnorePages::Pages(vec![(1, 3), (7, 7)]));
    assert_eq!(pages.to_string(), "1-3,7");
    assert_eq!(pages.resolve(5), BTreeSet::from([0, 1, 2]));
    assert_eq!(pages.resolve(10), BTreeSet::from([0, 1, 2, 6]));
  }

  #[tokio::test]
  async fn test_chat_streams_into_one_turn() {
    let backend = Scripted::new(vec!["Trans", "formers ", "are great."]);
    let mut chat = ChatSession::new(&backend, "Attention", "   ");

    let mut seen = String::new();
    let reply = chat.ask("What is new?", |chunk| seen.push_str(chunk)).await.unwrap();
    assert_eq!(reply.content, "Transformers are great.");
    assert_eq!(seen, "Transformers are great.");
    assert_eq!(chat.messages().len(), 2);

    let request = backend.requests.lock().unwrap()[0].clone();
    assert_eq!(request.paper_abstract, "No abstract available");
    assert_eq!(request.pdf_url, None);
    assert_eq!(request.messages.len(), 1);
  }

  #[tokio::test]
  async fn test_chat_cap_counts_failed_questions() {
    let mut backend = Scripted::new(vec!["ok"]);
    backend.fail_after = Some(1);
    let mut chat = ChatSession::new(&backend, "Attention", "Abstract");
    chat.use_processed_pdf("https://arxiv.org/pdf/1706.03762.pdf");

    for i in 0..MAX_QUESTIONS {
      let reply = chat.ask(&format!("question {i}"), |_| {}).await.unwrap();
      if i > 0 {
        assert_eq!(reply.content, CHAT_ERROR_REPLY);
      }
    }
    assert_eq!(chat.remaining(), 0);
    assert!(matches!(chat.ask("one more", |_| {}).await, Err(ScholiaError::ChatLimitReached(5))));
    assert_eq!(backend.requests.lock().unwrap().len(), MAX_QUESTIONS);
    assert_eq!(
      backend.requests.lock().unwrap()[0].pdf_url.as_deref(),
      Some("https://arxiv.org/pdf/1706.03762.pdf")
    );
  }

  #[tokio::test]
  async fn test_blank_question_is_not_counted() {
    let backend = Scripted::new(vec![]);
    let mut chat = ChatSession::new(&backend, "Attention", "Abstract");
    assert!(chat.ask("  ", |_| {}).await.is_err());
    assert_eq!(chat.remaining(), MAX_QUESTIONS);
  }

  #[tokio::test]
  async fn test_open_paper_prefers_external_ids() {
    let client = AssistantClient::new().with_base_url("http://127.0.0.1:9");
    let mut paper = sample_paper();
    paper.external_ids.insert("ACL".into(), "2020.acl-main.1".into());

    match client.open_paper(&paper).await {
      PaperTarget::Pdf(link) => assert_eq!(link.url, "https://aclanthology.org/2020.acl-main.1.pdf"),
      other => panic!("expected a PDF, got {other:?}"),
    }
  }

  #[traced_test]
  #[tokio::test]
  async fn test_unreachable_service_falls_back_to_landing_page() {
    let client = AssistantClient::new().with_base_url("http://127.0.0.1:9/");
    let paper = sample_paper();

    assert_eq!(client.resolve_pdf(&paper.url).await, PdfResolution::default());
    assert_eq!(client.open_paper(&paper).await, PaperTarget::Landing(paper.url.clone()));
    assert!(logs_contain("PDF resolution failed"));
  }

  fn sample_paper() -> ExternalPaper {
    ExternalPaper {
      id:                         "abc".into(),
      title:                      "A paper".into(),
      authors:                    vec!["Ada".into()],
      abstract_text:              String::new(),
      published:                  "2021".into(),
      url:                        "https://example.org/paper/abc".into(),
      pdf_url:                    None,
      fields_of_study:            Vec::new(),
      citation_count:             0,
      influential_citation_count: 0,
      publication_types:          Vec::new(),
      venue:                      None,
      source:                     crate::external::PaperSource::SemanticScholar,
      external_ids:               Default::default(),
    }
  }
}
