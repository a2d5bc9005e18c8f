//! The normalized shape of a paper found through arXiv or Semantic Scholar.
//!
//! Search results and recommendations from both sources are mapped into [`ExternalPaper`] so
//! the rest of the crate never sees a source-specific schema. These records are transient: they
//! are only persisted once a user saves one into their library.

use super::*;

/// Where an [`ExternalPaper`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaperSource {
  /// The arXiv Atom feed.
  Arxiv,
  /// The Semantic Scholar graph and recommendation APIs.
  SemanticScholar,
}

impl PaperSource {
  /// The source to try when this one fails.
  pub fn other(self) -> Self {
    match self {
      Self::Arxiv => Self::SemanticScholar,
      Self::SemanticScholar => Self::Arxiv,
    }
  }

  /// The name used in configuration and on the command line.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Arxiv => "arxiv",
      Self::SemanticScholar => "semantic-scholar",
    }
  }
}

impl Display for PaperSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for PaperSource {
  type Err = ScholiaError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_lowercase().as_str() {
      "arxiv" => Ok(Self::Arxiv),
      "semantic-scholar" | "semanticscholar" | "semantic_scholar" | "ss" =>
        Ok(Self::SemanticScholar),
      _ => Err(ScholiaError::InvalidSource(s.to_string())),
    }
  }
}

/// Cross-reference identifiers, keyed the way Semantic Scholar names them (`ArXiv`, `DOI`,
/// `ACL`, `PubMedCentral`, ...).
pub type ExternalIds = BTreeMap<String, String>;

/// A search or recommendation result in the shared internal shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPaper {
  /// Source-specific id: the arXiv id or the Semantic Scholar paper id.
  pub id:                         String,
  /// Title with whitespace collapsed.
  pub title:                      String,
  /// Author names in byline order.
  pub authors:                    Vec<String>,
  /// The abstract, empty when the source has none.
  #[serde(rename = "abstract")]
  pub abstract_text:              String,
  /// Free-form date string as reported by the source (`2023-01-02T00:00:00Z`, `2021`, ...).
  pub published:                  String,
  /// Landing page.
  pub url:                        String,
  /// A PDF the source links directly, if any.
  pub pdf_url:                    Option<String>,
  /// Fields or arXiv categories.
  pub fields_of_study:            Vec<String>,
  /// Citations, zero for arXiv.
  pub citation_count:             u64,
  /// Influential citations as Semantic Scholar counts them.
  pub influential_citation_count: u64,
  /// Journal article, conference paper and the like.
  pub publication_types:          Vec<String>,
  /// Journal or conference.
  pub venue:                      Option<String>,
  /// Which adapter produced the record.
  pub source:                     PaperSource,
  /// Cross-reference ids used to derive a PDF link.
  #[serde(default)]
  pub external_ids:               ExternalIds,
}

/// A direct PDF location and a label for where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLink {
  /// The PDF itself.
  pub url:         String,
  /// Human-readable source, such as `arXiv`.
  pub source_name: String,
}

/// Derives a PDF link from well-known external identifiers.
///
/// Checked in priority order: arXiv, ACL Anthology, PubMed Central. Returns `None` when none of
/// these identifiers are present, in which case the PDF service has to resolve the landing page.
pub fn pdf_link_from_external_ids(ids: &ExternalIds) -> Option<PdfLink> {
  if let Some(id) = ids.get("ArXiv") {
    return Some(PdfLink {
      url:         format!("https://arxiv.org/pdf/{id}.pdf"),
      source_name: "arXiv".into(),
    });
  }
  if let Some(id) = ids.get("ACL") {
    return Some(PdfLink {
      url:         format!("https://aclanthology.org/{id}.pdf"),
      source_name: "ACL Anthology".into(),
    });
  }
  ids.get("PubMedCentral").map(|id| PdfLink {
    url:         format!("https://www.ncbi.nlm.nih.gov/pmc/articles/{id}/pdf/"),
    source_name: "PubMed Central".into(),
  })
}
