//! User profiles.
//!
//! A profile is created on the first save after sign-up and only ever changed by its owner. The
//! research topics double as the seeds for the personalised discovery feeds.

use super::*;

/// Upper bound on research topics per profile.
pub const MAX_TOPICS: usize = 5;

/// A titled link to one of the user's own publications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchPaperRef {
  /// Title as the user entered it.
  pub title: String,
  /// Where the publication can be read.
  pub url:   String,
}

/// Public-facing information about a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  /// The account this profile belongs to.
  pub user_id:         String,
  /// Display name. The only required field.
  pub username:        String,
  /// Contact address shown to other users. Falls back to the account email when unset.
  pub email:           Option<String>,
  /// Phone number.
  pub contact_no:      Option<String>,
  /// Job title or role.
  pub profession:      Option<String>,
  /// Institution or employer.
  pub university:      Option<String>,
  /// Link to a CV.
  pub cv_url:          Option<String>,
  /// Personal site or portfolio.
  pub portfolio_link:  Option<String>,
  /// The user's own publications.
  pub research_papers: Vec<ResearchPaperRef>,
  /// Research interests, at most [`MAX_TOPICS`]. They seed the topic feeds.
  pub topics:          Vec<String>,
}

impl Profile {
  /// A minimal profile with only the required display name set.
  pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
    Self { user_id: user_id.into(), username: username.into(), ..Default::default() }
  }

  /// Replaces the research topics.
  pub fn with_topics<I, S>(mut self, topics: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    self.topics = topics.into_iter().map(Into::into).collect();
    self
  }

  /// Checks the profile form rules and drops blank topics.
  pub fn validate(mut self) -> Result<Self> {
    if self.username.trim().is_empty() {
      return Err(ScholiaError::Validation("Username is required".into()));
    }
    self.topics.retain(|topic| !topic.trim().is_empty());
    if self.topics.len() > MAX_TOPICS {
      return Err(ScholiaError::Validation(format!(
        "At most {MAX_TOPICS} research topics are allowed"
      )));
    }
    self.research_papers.retain(|paper| !paper.title.trim().is_empty());
    Ok(self)
  }

  /// The research topics that seed discovery feeds.
  pub fn feed_topics(&self) -> impl Iterator<Item = &str> {
    self.topics.iter().map(|topic| topic.trim()).filter(|topic| !topic.is_empty())
  }
}
