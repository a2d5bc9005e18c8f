use super::*;
use crate::{
  external::ExternalPaper,
  library::{clean_tags, SaveToggle, SavedPaper, TagCascade},
};

const SAVED_COLUMNS: &str = "user_id, paper_id, title, abstract_text, authors, published, url, \
                             source, external_ids, tags, created_at, updated_at";

fn saved_from_row(row: &Row<'_>) -> rusqlite::Result<SavedPaper> {
  Ok(SavedPaper {
    user_id:       row.get(0)?,
    paper_id:      row.get(1)?,
    title:         row.get(2)?,
    abstract_text: row.get(3)?,
    authors:       json_column(row, 4)?,
    published:     row.get(5)?,
    url:           row.get(6)?,
    source:        parsed_column(row, 7)?,
    external_ids:  json_column(row, 8)?,
    tags:          json_column(row, 9)?,
    created_at:    row.get(10)?,
    updated_at:    row.get(11)?,
  })
}

fn fetch_saved(
  conn: &rusqlite::Connection,
  user_id: &str,
  paper_id: &str,
) -> rusqlite::Result<Option<SavedPaper>> {
  conn
    .prepare_cached(&format!(
      "SELECT {SAVED_COLUMNS} FROM saved_papers WHERE user_id = ?1 AND paper_id = ?2"
    ))?
    .query_row(params![user_id, paper_id], saved_from_row)
    .optional()
}

fn insert_saved(conn: &rusqlite::Connection, saved: &SavedPaper) -> rusqlite::Result<usize> {
  conn.prepare_cached(&format!(
    "INSERT INTO saved_papers ({SAVED_COLUMNS})
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
  ))?
  .execute(params![
    saved.user_id,
    saved.paper_id,
    saved.title,
    saved.abstract_text,
    to_json(&saved.authors)?,
    saved.published,
    saved.url,
    saved.source.as_str(),
    to_json(&saved.external_ids)?,
    to_json(&saved.tags)?,
    saved.created_at,
    saved.updated_at,
  ])
}

fn write_tags(
  conn: &rusqlite::Connection,
  user_id: &str,
  paper_id: &str,
  tags: &[String],
) -> rusqlite::Result<usize> {
  conn
    .prepare_cached(
      "UPDATE saved_papers SET tags = ?3, updated_at = ?4 WHERE user_id = ?1 AND paper_id = ?2",
    )?
    .execute(params![user_id, paper_id, to_json(&tags)?, Utc::now()])
}

/// Saves a paper that isn't in the library yet, or removes one that is.
///
/// Removing drops the row and its tags, so saving the same paper again starts untagged.
pub struct ToggleSave {
  user_id: String,
  paper:   ExternalPaper,
}

impl ToggleSave {
  pub fn new(user_id: impl Into<String>, paper: ExternalPaper) -> Self {
    Self { user_id: user_id.into(), paper }
  }
}

#[async_trait]
impl DatabaseInstruction for ToggleSave {
  type Output = SaveToggle;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let snapshot = SavedPaper::snapshot(&self.user_id, &self.paper);
    Ok(
      db.conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let removed = tx.execute(
            "DELETE FROM saved_papers WHERE user_id = ?1 AND paper_id = ?2",
            params![snapshot.user_id, snapshot.paper_id],
          )?;
          let toggle = if removed > 0 {
            SaveToggle::Unsaved
          } else {
            insert_saved(&tx, &snapshot)?;
            SaveToggle::Saved
          };
          tx.commit()?;
          Ok(toggle)
        })
        .await?,
    )
  }
}

/// Replaces the tags on a saved paper.
pub struct SetTags {
  user_id:  String,
  paper_id: String,
  tags:     Vec<String>,
}

impl SetTags {
  pub fn new<I, S>(user_id: impl Into<String>, paper_id: impl Into<String>, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    Self { user_id: user_id.into(), paper_id: paper_id.into(), tags: clean_tags(tags) }
  }
}

#[async_trait]
impl DatabaseInstruction for SetTags {
  type Output = SavedPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (user_id, paper_id, tags) = (self.user_id.clone(), self.paper_id.clone(), self.tags.clone());
    let saved = db
      .conn
      .call(move |conn| {
        if write_tags(conn, &user_id, &paper_id, &tags)? == 0 {
          return Ok(None);
        }
        Ok(fetch_saved(conn, &user_id, &paper_id)?)
      })
      .await?;
    saved.ok_or_else(|| ScholiaError::NotFound(format!("Saved paper {}", self.paper_id)))
  }
}

/// Tags a paper, saving it first if it isn't in the library.
///
/// The save and the tag write are two separate statements; if the second fails the paper stays
/// saved without the new tags.
pub struct TagPaper {
  user_id: String,
  paper:   ExternalPaper,
  tags:    Vec<String>,
}

impl TagPaper {
  pub fn new<I, S>(user_id: impl Into<String>, paper: ExternalPaper, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    Self { user_id: user_id.into(), paper, tags: clean_tags(tags) }
  }
}

#[async_trait]
impl DatabaseInstruction for TagPaper {
  type Output = SavedPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let snapshot = SavedPaper::snapshot(&self.user_id, &self.paper);
    let saved_now = db
      .conn
      .call(move |conn| {
        if fetch_saved(conn, &snapshot.user_id, &snapshot.paper_id)?.is_some() {
          return Ok(false);
        }
        insert_saved(conn, &snapshot)?;
        Ok(true)
      })
      .await?;
    if saved_now {
      debug!("Saved {} before tagging", self.paper.id);
    }

    SetTags::new(&self.user_id, &self.paper.id, &self.tags).execute(db).await
  }
}

/// A user's library, newest first, optionally only papers carrying one tag.
pub struct ListSaved {
  user_id: String,
  tag:     Option<String>,
}

impl ListSaved {
  pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: user_id.into(), tag: None } }

  pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
    self.tag = Some(tag.into().trim().to_string()).filter(|tag| !tag.is_empty());
    self
  }
}

#[async_trait]
impl DatabaseInstruction for ListSaved {
  type Output = Vec<SavedPaper>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (user_id, tag) = (self.user_id.clone(), self.tag.clone());
    Ok(
      db.conn
        .call(move |conn| {
          let mut stmt = conn.prepare_cached(&format!(
            "SELECT {SAVED_COLUMNS} FROM saved_papers
             WHERE user_id = ?1
               AND (?2 IS NULL OR EXISTS (SELECT 1 FROM json_each(saved_papers.tags) WHERE value = ?2))
             ORDER BY created_at DESC, id DESC"
          ))?;
          let papers =
            stmt.query_map(params![user_id, tag], saved_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(papers)
        })
        .await?,
    )
  }
}

/// External ids of everything in a user's library.
pub struct SavedIds {
  user_id: String,
}

impl SavedIds {
  pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: user_id.into() } }
}

#[async_trait]
impl DatabaseInstruction for SavedIds {
  type Output = BTreeSet<String>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let user_id = self.user_id.clone();
    Ok(
      db.conn
        .call(move |conn| {
          let mut stmt = conn.prepare_cached("SELECT paper_id FROM saved_papers WHERE user_id = ?1")?;
          let ids = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
          Ok(ids)
        })
        .await?,
    )
  }
}

/// The union of tags across a user's library.
pub struct UserTags {
  user_id: String,
}

impl UserTags {
  pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: user_id.into() } }
}

#[async_trait]
impl DatabaseInstruction for UserTags {
  type Output = BTreeSet<String>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let papers = ListSaved::for_user(&self.user_id).execute(db).await?;
    Ok(crate::library::tag_vocabulary(&papers))
  }
}

/// Removes a tag from every saved paper of a user that carries it.
///
/// Each paper is rewritten on its own. A failure is counted and the remaining papers are still
/// attempted.
pub struct DeleteTag {
  user_id: String,
  tag:     String,
}

impl DeleteTag {
  pub fn new(user_id: impl Into<String>, tag: impl Into<String>) -> Self {
    Self { user_id: user_id.into(), tag: tag.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for DeleteTag {
  type Output = TagCascade;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let tag = self.tag.trim().to_string();
    if tag.is_empty() {
      return Err(ScholiaError::Validation("Tag name is required".into()));
    }
    let tagged = ListSaved::for_user(&self.user_id).with_tag(&tag).execute(db).await?;

    let mut cascade = TagCascade::default();
    for paper in tagged {
      let remaining: Vec<String> = paper.tags.iter().filter(|t| **t != tag).cloned().collect();
      let (user_id, paper_id) = (paper.user_id.clone(), paper.paper_id.clone());
      let result = db
        .conn
        .call(move |conn| Ok(write_tags(conn, &user_id, &paper_id, &remaining)?))
        .await;
      match result {
        Ok(_) => cascade.updated += 1,
        Err(e) => {
          warn!("Failed to remove tag \"{tag}\" from {}: {e}", paper.paper_id);
          cascade.failed += 1;
        },
      }
    }
    debug!("Removed tag \"{tag}\": {cascade:?}");
    Ok(cascade)
  }
}
