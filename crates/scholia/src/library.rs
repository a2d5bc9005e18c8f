//! A user's personal library of saved external papers and their tags.
//!
//! Tags are free text attached to one saved paper. There is no tag table: a user's vocabulary
//! is the union of the tags across all their saved papers, computed when asked for.

use super::*;
use crate::external::{ExternalIds, ExternalPaper, PaperSource};

/// A library entry: a snapshot of an external paper plus the owner's tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPaper {
  /// Owner of the entry.
  pub user_id:       String,
  /// The external paper id, unique per user.
  pub paper_id:      String,
  /// Title at the time of saving.
  pub title:         String,
  /// Abstract at the time of saving.
  #[serde(rename = "abstract")]
  pub abstract_text: String,
  /// Author names.
  pub authors:       Vec<String>,
  /// Publication date as the source reported it.
  pub published:     String,
  /// Landing page.
  pub url:           String,
  /// Where the paper was found.
  pub source:        PaperSource,
  /// Cross-reference ids kept for PDF lookup.
  pub external_ids:  ExternalIds,
  /// The owner's tags, without duplicates.
  pub tags:          Vec<String>,
  /// When the paper was saved.
  pub created_at:    DateTime<Utc>,
  /// When the tags last changed.
  pub updated_at:    DateTime<Utc>,
}

impl SavedPaper {
  /// Snapshots `paper` for `user_id` with no tags.
  pub fn snapshot(user_id: &str, paper: &ExternalPaper) -> Self {
    let now = Utc::now();
    Self {
      user_id:       user_id.to_string(),
      paper_id:      paper.id.clone(),
      title:         paper.title.clone(),
      abstract_text: paper.abstract_text.clone(),
      authors:       paper.authors.clone(),
      published:     paper.published.clone(),
      url:           paper.url.clone(),
      source:        paper.source,
      external_ids:  paper.external_ids.clone(),
      tags:          Vec::new(),
      created_at:    now,
      updated_at:    now,
    }
  }

  /// Whether the entry carries exactly `tag`.
  pub fn has_tag(&self, tag: &str) -> bool { self.tags.iter().any(|t| t == tag) }

  /// Rebuilds an [`ExternalPaper`] from the snapshot, e.g. to open its PDF or fetch
  /// recommendations. Citation metrics were never stored and come back as zero.
  pub fn to_external(&self) -> ExternalPaper {
    ExternalPaper {
      id:                         self.paper_id.clone(),
      title:                      self.title.clone(),
      authors:                    self.authors.clone(),
      abstract_text:              self.abstract_text.clone(),
      published:                  self.published.clone(),
      url:                        self.url.clone(),
      pdf_url:                    None,
      fields_of_study:            Vec::new(),
      citation_count:             0,
      influential_citation_count: 0,
      publication_types:          Vec::new(),
      venue:                      None,
      source:                     self.source,
      external_ids:               self.external_ids.clone(),
    }
  }
}

/// What toggling a save did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveToggle {
  /// The paper is now in the library.
  Saved,
  /// The paper was removed from the library.
  Unsaved,
}

/// Aggregate result of removing a tag from every saved paper that carries it.
///
/// Rows are rewritten one at a time, so a failure part way leaves the earlier rows updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagCascade {
  /// Rows that lost the tag.
  pub updated: usize,
  /// Rows that could not be rewritten.
  pub failed:  usize,
}

impl TagCascade {
  /// Whether every row was rewritten.
  pub fn is_complete(&self) -> bool { self.failed == 0 }
}

/// Normalizes user-entered tags: trimmed, blanks dropped, first occurrence kept.
pub fn clean_tags<I, S>(tags: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>, {
  let mut seen = BTreeSet::new();
  tags
    .into_iter()
    .filter_map(|tag| {
      let tag = tag.as_ref().trim();
      (!tag.is_empty() && seen.insert(tag.to_string())).then(|| tag.to_string())
    })
    .collect()
}

/// The set-union of tags across `papers`.
pub fn tag_vocabulary<'a>(papers: impl IntoIterator<Item = &'a SavedPaper>) -> BTreeSet<String> {
  papers.into_iter().flat_map(|paper| paper.tags.iter().cloned()).collect()
}
