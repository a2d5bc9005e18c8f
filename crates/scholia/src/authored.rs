//! Authored papers: drafts owned by a first author and shared with collaborators by URN.
//!
//! This module holds the record itself and the pure form logic around it. Persistence lives in
//! [`database::instruction::authored`](crate::database::instruction::authored) and the join flow
//! in [`collaboration`](crate::collaboration).

use super::*;
use crate::{
  collaboration::{finalize_authorizations, resize_slots},
  profile::Profile,
  urn::Urn,
};

/// Most collaborators a paper may ask for.
pub const MAX_COLLABORATORS: u32 = 10;

/// Document templates offered when creating a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
  /// IEEE conference and journal style.
  Ieee,
  /// Springer LNCS style.
  Springer,
  /// ACM article style.
  Acm,
  /// Nature journal style.
  Nature,
  /// Elsevier journal style.
  Elsevier,
}

impl Template {
  /// Every template, in the order the form lists them.
  pub const ALL: [Template; 5] =
    [Template::Ieee, Template::Springer, Template::Acm, Template::Nature, Template::Elsevier];

  /// The lowercase name stored and accepted on input.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Ieee => "ieee",
      Self::Springer => "springer",
      Self::Acm => "acm",
      Self::Nature => "nature",
      Self::Elsevier => "elsevier",
    }
  }
}

impl Display for Template {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Template {
  type Err = ScholiaError;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|template| template.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| ScholiaError::Validation("Template selection is required".into()))
  }
}

/// A paper draft owned by its first author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoredPaper {
  /// Internal id, a UUID.
  pub id:                       String,
  /// The shareable handle collaborators join with.
  pub urn:                      Urn,
  /// Title, trimmed.
  pub title:                    String,
  /// The abstract.
  #[serde(rename = "abstract")]
  pub abstract_text:            String,
  /// Why the author is writing the paper.
  pub motive:                   String,
  /// Topic tags, matched exactly by public search.
  pub topic_tags:               Vec<String>,
  /// How far along the draft is, 0 to 100.
  pub completion_percentage:    u32,
  /// Document template.
  pub template:                 Template,
  /// Collaborator slots, 1 to [`MAX_COLLABORATORS`].
  pub collaborators_needed:     u32,
  /// The first author, the only user who may change the paper.
  pub author_id:                String,
  /// Users who have joined. Each was on the allow-list when they joined.
  pub collaborators:            Vec<String>,
  /// The allow-list of users the author has pre-approved.
  pub collaborators_authorized: Vec<String>,
  /// Whether public search lists the paper.
  pub is_public:                bool,
  /// The saved draft. `None` until the author first saves one.
  pub content:                  Option<String>,
  /// When the paper was created.
  pub created_at:               DateTime<Utc>,
  /// When any column last changed.
  pub updated_at:               DateTime<Utc>,
}

impl AuthoredPaper {
  /// Whether `user_id` is the first author.
  pub fn is_author(&self, user_id: &str) -> bool { self.author_id == user_id }

  /// Whether `user_id` is the author or a joined collaborator.
  pub fn is_member(&self, user_id: &str) -> bool {
    self.is_author(user_id) || self.collaborators.iter().any(|id| id == user_id)
  }

  /// Slots not yet taken by a joined collaborator.
  pub fn open_slots(&self) -> u32 {
    self.collaborators_needed.saturating_sub(self.collaborators.len() as u32)
  }

  /// Fails with the edit-permission message unless `user_id` owns the paper.
  pub fn ensure_author(&self, user_id: &str) -> Result<()> {
    if self.is_author(user_id) {
      Ok(())
    } else {
      Err(ScholiaError::Unauthorized("You are not authorized to edit this paper".into()))
    }
  }
}

/// Splits a comma separated tag field, trimming and dropping empty entries.
pub fn parse_topic_tags(raw: &str) -> Vec<String> {
  raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()).map(String::from).collect()
}

fn require(value: &str, message: &str) -> Result<()> {
  if value.trim().is_empty() {
    Err(ScholiaError::Validation(message.into()))
  } else {
    Ok(())
  }
}

fn check_ranges(collaborators_needed: u32, completion_percentage: u32) -> Result<()> {
  if !(1..=MAX_COLLABORATORS).contains(&collaborators_needed) {
    return Err(ScholiaError::Validation(format!(
      "Number of collaborators must be between 1 and {MAX_COLLABORATORS}"
    )));
  }
  if completion_percentage > 100 {
    return Err(ScholiaError::Validation(
      "Completion percentage must be between 0 and 100".into(),
    ));
  }
  Ok(())
}

/// The first-author creation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaper {
  /// Title of the paper.
  pub title:                 String,
  /// Raw comma separated tags as typed.
  pub topic_tags:            String,
  /// The abstract.
  pub abstract_text:         String,
  /// Why the author is writing it.
  pub motive:                String,
  /// How far along the draft is, 0 to 100.
  pub completion_percentage: u32,
  /// Document template.
  pub template:              Template,
  /// Collaborator slots, 1 to [`MAX_COLLABORATORS`].
  pub collaborators_needed:  u32,
  /// The author agreed to the terms of collaboration.
  pub agreement:             bool,
  /// Must equal the author's display name, ignoring case.
  pub signature:             String,
  /// Whether the paper shows up in public search. New papers are private unless asked.
  #[serde(default)]
  pub is_public:             bool,
}

impl NewPaper {
  /// Checks the creation form against the author's profile.
  pub fn validate(&self, author: Option<&Profile>) -> Result<()> {
    require(&self.title, "Title is required")?;
    require(&self.topic_tags, "Topic tags are required")?;
    require(&self.abstract_text, "Abstract is required")?;
    require(&self.motive, "Motive is required")?;
    check_ranges(self.collaborators_needed, self.completion_percentage)?;
    if !self.agreement {
      return Err(ScholiaError::Validation("You must agree to the terms".into()));
    }
    require(&self.signature, "Signature is required")?;

    let author = author
      .ok_or_else(|| ScholiaError::Validation("Please complete your profile first".into()))?;
    if !self.signature.trim().eq_ignore_ascii_case(author.username.trim()) {
      return Err(ScholiaError::Validation("Signature must match your profile name".into()));
    }
    Ok(())
  }

  /// Turns a validated form into a fresh record with a newly minted URN and empty
  /// collaborator lists.
  pub fn into_paper(self, author_id: &str) -> AuthoredPaper {
    let now = Utc::now();
    AuthoredPaper {
      id:                       uuid::Uuid::new_v4().to_string(),
      urn:                      Urn::generate(),
      title:                    self.title.trim().to_string(),
      abstract_text:            self.abstract_text,
      motive:                   self.motive,
      topic_tags:               parse_topic_tags(&self.topic_tags),
      completion_percentage:    self.completion_percentage,
      template:                 self.template,
      collaborators_needed:     self.collaborators_needed,
      author_id:                author_id.to_string(),
      collaborators:            Vec::new(),
      collaborators_authorized: Vec::new(),
      is_public:                self.is_public,
      content:                  None,
      created_at:               now,
      updated_at:               now,
    }
  }
}

/// The author-side edit form, including the allow-list slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperEdit {
  /// New title.
  pub title:                 String,
  /// Raw comma separated tags.
  pub topic_tags:            String,
  /// New abstract.
  pub abstract_text:         String,
  /// New motive.
  pub motive:                String,
  /// New completion percentage.
  pub completion_percentage: u32,
  /// New slot count.
  pub collaborators_needed:  u32,
  /// One entry per expected collaborator; blank entries are unfilled slots.
  pub slots:                 Vec<String>,
}

impl PaperEdit {
  /// Prefills the form from a stored paper, padding the allow-list out to the slot count.
  pub fn from_paper(paper: &AuthoredPaper) -> Self {
    Self {
      title:                 paper.title.clone(),
      topic_tags:            paper.topic_tags.join(", "),
      abstract_text:         paper.abstract_text.clone(),
      motive:                paper.motive.clone(),
      completion_percentage: paper.completion_percentage,
      collaborators_needed:  paper.collaborators_needed,
      slots:                 resize_slots(
        &paper.collaborators_authorized,
        paper.collaborators_needed as usize,
      ),
    }
  }

  /// Changes the slot count, resizing the slots the same way the edit form does.
  pub fn set_collaborators_needed(&mut self, needed: u32) {
    self.collaborators_needed = needed;
    self.slots = resize_slots(&self.slots, needed as usize);
  }

  /// Fills slot `index`, growing the slot list if needed. Slots past [`MAX_COLLABORATORS`]
  /// can never be saved and are rejected.
  pub fn set_slot(&mut self, index: usize, user_id: impl Into<String>) -> Result<()> {
    if index >= MAX_COLLABORATORS as usize {
      return Err(ScholiaError::Validation(format!(
        "Slot {} is out of range, a paper has at most {MAX_COLLABORATORS} collaborators",
        index.saturating_add(1)
      )));
    }
    if self.slots.len() <= index {
      self.slots.resize(index + 1, String::new());
    }
    self.slots[index] = user_id.into();
    Ok(())
  }

  /// Validates the form and writes it into `paper`.
  ///
  /// Ids that left the allow-list are also dropped from `collaborators`. Returns the ids that
  /// were removed from the active collaborator list.
  pub fn apply(self, paper: &mut AuthoredPaper) -> Result<Vec<String>> {
    require(&self.title, "Title is required")?;
    require(&self.topic_tags, "Topic tags are required")?;
    require(&self.abstract_text, "Abstract is required")?;
    require(&self.motive, "Motive is required")?;
    check_ranges(self.collaborators_needed, self.completion_percentage)?;

    let authorized = finalize_authorizations(&self.slots, self.collaborators_needed as usize)?;

    let deauthorized: Vec<&String> =
      paper.collaborators_authorized.iter().filter(|id| !authorized.contains(id)).collect();
    let (removed, kept): (Vec<String>, Vec<String>) =
      paper.collaborators.iter().cloned().partition(|id| deauthorized.contains(&id));

    paper.title = self.title.trim().to_string();
    paper.topic_tags = parse_topic_tags(&self.topic_tags);
    paper.abstract_text = self.abstract_text;
    paper.motive = self.motive;
    paper.completion_percentage = self.completion_percentage;
    paper.collaborators_needed = self.collaborators_needed;
    paper.collaborators_authorized = authorized;
    paper.collaborators = kept;
    paper.updated_at = Utc::now();
    Ok(removed)
  }
}

/// The draft a member sees before the author saves any content: the paper's title, abstract
/// and motive laid out in the usual section skeleton.
pub fn default_content(paper: &AuthoredPaper) -> String {
  let or_placeholder = |value: &str, placeholder: &'static str| {
    if value.trim().is_empty() { placeholder.to_string() } else { value.to_string() }
  };
  let mut html = format!("<h1>{}</h1>\n\n", paper.title);
  html.push_str(&format!(
    "<h2>Abstract</h2>\n<p>{}</p>\n\n",
    or_placeholder(&paper.abstract_text, "Abstract content goes here...")
  ));
  html.push_str(&format!(
    "<h2>1. Introduction</h2>\n<p>{}</p>\n\n",
    or_placeholder(&paper.motive, "Introduction content goes here...")
  ));
  for (heading, body) in [
    ("2. Literature Review", "Literature review content goes here..."),
    ("3. Methodology", "Methodology content goes here..."),
    ("4. Results", "Results content goes here..."),
    ("5. Discussion", "Discussion content goes here..."),
    ("6. Conclusion", "Conclusion content goes here..."),
    ("References", "References go here..."),
  ] {
    html.push_str(&format!("<h2>{heading}</h2>\n<p>{body}</p>\n\n"));
  }
  html
}

/// The saved content of `paper`, or [`default_content`] while nothing has been saved.
pub fn draft_content(paper: &AuthoredPaper) -> String {
  match &paper.content {
    Some(content) if !content.trim().is_empty() => content.clone(),
    _ => default_content(paper),
  }
}

/// Wraps a draft into a standalone HTML document for download.
pub fn export_html(title: &str, content: &str) -> String {
  format!(
    "<!DOCTYPE html>\n<html>\n  <head>\n    <title>{title}</title>\n    <style>\n      \
     body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }}\n      \
     h1 {{ color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }}\n      \
     h2 {{ color: #555; margin-top: 30px; }}\n      \
     p {{ line-height: 1.6; margin-bottom: 15px; }}\n    </style>\n  </head>\n  <body>\n\
     {content}\n  </body>\n</html>\n"
  )
}

/// File name for an exported draft: the title lowercased with every other character as `_`.
pub fn export_file_name(title: &str) -> String {
  let stem: String =
    title.chars().map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' }).collect();
  format!("{stem}.html")
}

/// Builds a `mailto:` link asking the author of `paper` to add `me` to its allow-list.
pub fn contact_author_mailto(paper: &AuthoredPaper, author_email: &str, me: &Profile) -> String {
  let name = if me.username.trim().is_empty() { "a researcher" } else { me.username.as_str() };
  let uuid = if me.user_id.is_empty() { "UUID not available" } else { me.user_id.as_str() };
  let subject = format!("Interest in Research Project: {}", paper.title);
  let body = format!(
    "Hello,\n\nI am {name}. This is my UUID: {uuid}. I would like to join your research project \
     \"{}\".\n\nHere is my resume attached with this mail for your reference. Waiting for your \
     reply.\n\nRegards,\n{name}",
    paper.title
  );
  format!("mailto:{author_email}?subject={}&body={}", encode_component(&subject), encode_component(&body))
}

/// Percent-encodes a mail header component with `%20` for spaces.
fn encode_component(value: &str) -> String {
  url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>().replace('+', "%20")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn form() -> NewPaper {
    NewPaper {
      title:                 "Sparse Attention".into(),
      topic_tags:            "nlp, transformers,, ".into(),
      abstract_text:         "We study sparsity.".into(),
      motive:                "Cheaper inference".into(),
      completion_percentage: 40,
      template:              Template::Acm,
      collaborators_needed:  2,
      agreement:             true,
      signature:             "ADA".into(),
      is_public:             false,
    }
  }

  #[test]
  fn test_parse_topic_tags() {
    assert_eq!(parse_topic_tags(" nlp, ml ,,cv, "), vec!["nlp", "ml", "cv"]);
    assert!(parse_topic_tags(" , ").is_empty());
  }

  #[test]
  fn test_template_parse() {
    assert_eq!("IEEE".parse::<Template>().unwrap(), Template::Ieee);
    assert!("latex".parse::<Template>().is_err());
  }

  #[test]
  fn test_new_paper_validation() {
    let ada = Profile::new("u1", "Ada");
    assert!(form().validate(Some(&ada)).is_ok());

    let err = form().validate(None).unwrap_err();
    assert_eq!(err.to_string(), "Please complete your profile first");

    let mut bad = form();
    bad.signature = "Grace".into();
    assert_eq!(
      bad.validate(Some(&ada)).unwrap_err().to_string(),
      "Signature must match your profile name"
    );

    let mut bad = form();
    bad.collaborators_needed = 11;
    assert!(bad.validate(Some(&ada)).is_err());

    let mut bad = form();
    bad.completion_percentage = 101;
    assert!(bad.validate(Some(&ada)).is_err());

    let mut bad = form();
    bad.agreement = false;
    assert_eq!(bad.validate(Some(&ada)).unwrap_err().to_string(), "You must agree to the terms");
  }

  #[test]
  fn test_into_paper_starts_empty() {
    let paper = form().into_paper("u1");
    assert!(paper.urn.is_well_formed());
    assert_eq!(paper.topic_tags, vec!["nlp", "transformers"]);
    assert!(paper.collaborators.is_empty());
    assert!(paper.collaborators_authorized.is_empty());
    assert!(!paper.is_public);
    assert_eq!(paper.open_slots(), 2);
  }

  #[test]
  fn test_into_paper_keeps_requested_visibility() {
    let mut public = form();
    public.is_public = true;
    assert!(public.into_paper("u1").is_public);
  }

  #[test]
  fn test_set_slot_rejects_out_of_range_index() {
    let paper = form().into_paper("u1");
    let mut edit = PaperEdit::from_paper(&paper);
    assert!(edit.set_slot(9, "A").is_ok());
    assert_eq!(edit.slots.len(), 10);

    for index in [10, 1_000_000_000, usize::MAX] {
      let err = edit.set_slot(index, "x").unwrap_err();
      assert!(matches!(err, ScholiaError::Validation(_)));
    }
    assert_eq!(edit.slots.len(), 10);
  }

  #[test]
  fn test_default_content_uses_abstract_and_motive() {
    let mut paper = form().into_paper("u1");
    let html = draft_content(&paper);
    assert!(html.starts_with("<h1>Sparse Attention</h1>"));
    assert!(html.contains("<p>We study sparsity.</p>"));
    assert!(html.contains("<h2>1. Introduction</h2>\n<p>Cheaper inference</p>"));
    assert!(html.contains("<h2>References</h2>"));

    paper.motive = " ".into();
    assert!(default_content(&paper).contains("Introduction content goes here..."));

    paper.content = Some("<p>Saved</p>".into());
    assert_eq!(draft_content(&paper), "<p>Saved</p>");
  }

  #[test]
  fn test_export_html() {
    assert_eq!(export_file_name("Sparse Attention: v2"), "sparse_attention__v2.html");
    let page = export_html("Sparse Attention", "<p>Body</p>");
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("<title>Sparse Attention</title>"));
    assert!(page.contains("<p>Body</p>"));
  }

  #[test]
  fn test_edit_strips_deauthorized_collaborators() {
    let mut paper = form().into_paper("u1");
    paper.collaborators_needed = 3;
    paper.collaborators_authorized = vec!["A".into(), "B".into(), "C".into()];
    paper.collaborators = vec!["A".into(), "C".into()];

    let mut edit = PaperEdit::from_paper(&paper);
    assert_eq!(edit.slots, vec!["A", "B", "C"]);
    edit.slots[2] = String::new();

    let removed = edit.apply(&mut paper).unwrap();
    assert_eq!(removed, vec!["C"]);
    assert_eq!(paper.collaborators, vec!["A"]);
    assert_eq!(paper.collaborators_authorized, vec!["A", "B"]);
  }

  #[test]
  fn test_edit_rejects_duplicates() {
    let mut paper = form().into_paper("u1");
    let mut edit = PaperEdit::from_paper(&paper);
    edit.set_slot(0, "A").unwrap();
    edit.set_slot(1, "A").unwrap();
    let err = edit.apply(&mut paper).unwrap_err();
    assert_eq!(err.to_string(), "Duplicate UUIDs are not allowed");
  }

  #[test]
  fn test_mailto_encoding() {
    let paper = form().into_paper("u1");
    let me = Profile::new("u2", "Grace Hopper");
    let link = contact_author_mailto(&paper, "ada@example.com", &me);
    assert!(link.starts_with("mailto:ada@example.com?subject=Interest%20in%20Research%20Project"));
    assert!(link.contains("u2"));
    assert!(!link.contains('+'));
    assert!(!link.contains(' '));
  }
}
