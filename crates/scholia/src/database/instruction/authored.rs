use rusqlite::ErrorCode;

use super::*;
use crate::{
  authored::{draft_content, AuthoredPaper, PaperEdit},
  urn::Urn,
};

const PAPER_COLUMNS: &str = "id, urn, title, abstract_text, motive, topic_tags, \
                             completion_percentage, template, collaborators_needed, author_id, \
                             collaborators, collaborators_authorized, is_public, content, \
                             created_at, updated_at";

pub(crate) fn paper_from_row(row: &Row<'_>) -> rusqlite::Result<AuthoredPaper> {
  Ok(AuthoredPaper {
    id:                       row.get(0)?,
    urn:                      Urn::from_stored(row.get::<_, String>(1)?),
    title:                    row.get(2)?,
    abstract_text:            row.get(3)?,
    motive:                   row.get(4)?,
    topic_tags:               json_column(row, 5)?,
    completion_percentage:    row.get(6)?,
    template:                 parsed_column(row, 7)?,
    collaborators_needed:     row.get(8)?,
    author_id:                row.get(9)?,
    collaborators:            json_column(row, 10)?,
    collaborators_authorized: json_column(row, 11)?,
    is_public:                row.get(12)?,
    content:                  row.get(13)?,
    created_at:               row.get(14)?,
    updated_at:               row.get(15)?,
  })
}

/// Which column identifies a paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaperKey {
  Id(String),
  Urn(Urn),
}

pub(crate) fn fetch_paper(
  conn: &rusqlite::Connection,
  key: &PaperKey,
) -> rusqlite::Result<Option<AuthoredPaper>> {
  let (column, value) = match key {
    PaperKey::Id(id) => ("id", id.as_str()),
    PaperKey::Urn(urn) => ("urn", urn.as_str()),
  };
  conn
    .prepare_cached(&format!("SELECT {PAPER_COLUMNS} FROM papers WHERE {column} = ?1"))?
    .query_row(params![value], paper_from_row)
    .optional()
}

/// Writes every mutable column of `paper` back to its row.
pub(crate) fn store_paper(conn: &rusqlite::Connection, paper: &AuthoredPaper) -> rusqlite::Result<usize> {
  conn.prepare_cached(
    "UPDATE papers SET
         title = ?2, abstract_text = ?3, motive = ?4, topic_tags = ?5,
         completion_percentage = ?6, collaborators_needed = ?7, collaborators = ?8,
         collaborators_authorized = ?9, is_public = ?10, content = ?11, updated_at = ?12
     WHERE id = ?1",
  )?
  .execute(params![
    paper.id,
    paper.title,
    paper.abstract_text,
    paper.motive,
    to_json(&paper.topic_tags)?,
    paper.completion_percentage,
    paper.collaborators_needed,
    to_json(&paper.collaborators)?,
    to_json(&paper.collaborators_authorized)?,
    paper.is_public,
    paper.content,
    paper.updated_at,
  ])
}

/// Loads a paper for a change only its author may make.
pub(crate) fn fetch_owned_paper(
  conn: &rusqlite::Connection,
  paper_id: &str,
  actor: &str,
) -> rusqlite::Result<Result<AuthoredPaper>> {
  Ok(match fetch_paper(conn, &PaperKey::Id(paper_id.to_string()))? {
    None => Err(ScholiaError::NotFound(format!("Paper {paper_id}"))),
    Some(paper) => paper.ensure_author(actor).map(|()| paper),
  })
}

/// Stores a newly created paper. A URN that is already taken fails the insert.
pub struct CreatePaper {
  paper: AuthoredPaper,
}

impl CreatePaper {
  pub fn new(paper: AuthoredPaper) -> Self { Self { paper } }
}

#[async_trait]
impl DatabaseInstruction for CreatePaper {
  type Output = AuthoredPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let paper = self.paper.clone();
    let row = paper.clone();
    let inserted = db
      .conn
      .call(move |conn| {
        let result = conn.execute(
          &format!(
            "INSERT INTO papers ({PAPER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
          ),
          params![
            row.id,
            row.urn.as_str(),
            row.title,
            row.abstract_text,
            row.motive,
            to_json(&row.topic_tags)?,
            row.completion_percentage,
            row.template.as_str(),
            row.collaborators_needed,
            row.author_id,
            to_json(&row.collaborators)?,
            to_json(&row.collaborators_authorized)?,
            row.is_public,
            row.content,
            row.created_at,
            row.updated_at,
          ],
        );
        match result {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, Some(msg)))
            if e.code == ErrorCode::ConstraintViolation && msg.contains("papers.urn") =>
            Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      warn!("URN {} already taken", paper.urn);
      return Err(ScholiaError::Validation(format!(
        "URN {} is already in use, please submit the paper again",
        paper.urn
      )));
    }
    debug!("Created paper {} with {}", paper.id, paper.urn);
    Ok(paper)
  }
}

/// Fetches one paper by id or URN.
pub struct GetPaper {
  key: PaperKey,
}

impl GetPaper {
  pub fn by_id(id: impl Into<String>) -> Self { Self { key: PaperKey::Id(id.into()) } }

  /// Looks a URN up as typed. Nothing is validated beyond an exact match.
  pub fn by_urn(urn: impl AsRef<str>) -> Self {
    Self { key: PaperKey::Urn(Urn::from_stored(urn.as_ref().trim())) }
  }
}

#[async_trait]
impl DatabaseInstruction for GetPaper {
  type Output = Option<AuthoredPaper>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let key = self.key.clone();
    Ok(db.conn.call(move |conn| Ok(fetch_paper(conn, &key)?)).await?)
  }
}

/// The stored paper after an edit, plus collaborators that lost their place.
#[derive(Debug, Clone)]
pub struct PaperUpdate {
  pub paper:   AuthoredPaper,
  pub removed: Vec<String>,
}

/// Applies the author's edit form to a paper.
pub struct UpdatePaper {
  paper_id: String,
  actor:    String,
  edit:     PaperEdit,
}

impl UpdatePaper {
  pub fn new(paper_id: impl Into<String>, actor: impl Into<String>, edit: PaperEdit) -> Self {
    Self { paper_id: paper_id.into(), actor: actor.into(), edit }
  }
}

#[async_trait]
impl DatabaseInstruction for UpdatePaper {
  type Output = PaperUpdate;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (paper_id, actor, edit) = (self.paper_id.clone(), self.actor.clone(), self.edit.clone());
    db.conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut paper = match fetch_owned_paper(&tx, &paper_id, &actor)? {
          Ok(paper) => paper,
          Err(e) => return Ok(Err(e)),
        };
        let removed = match edit.apply(&mut paper) {
          Ok(removed) => removed,
          Err(e) => return Ok(Err(e)),
        };
        store_paper(&tx, &paper)?;
        tx.commit()?;
        Ok(Ok(PaperUpdate { paper, removed }))
      })
      .await?
  }
}

/// Deletes a paper. Only its author may.
pub struct DeletePaper {
  paper_id: String,
  actor:    String,
}

impl DeletePaper {
  pub fn new(paper_id: impl Into<String>, actor: impl Into<String>) -> Self {
    Self { paper_id: paper_id.into(), actor: actor.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for DeletePaper {
  type Output = ();

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (paper_id, actor) = (self.paper_id.clone(), self.actor.clone());
    db.conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Err(e) = fetch_owned_paper(&tx, &paper_id, &actor)? {
          return Ok(Err(e));
        }
        tx.execute("DELETE FROM papers WHERE id = ?1", params![paper_id])?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?
  }
}

/// Makes a paper public or private. Only its author may.
pub struct SetVisibility {
  paper_id:  String,
  actor:     String,
  is_public: bool,
}

impl SetVisibility {
  pub fn new(paper_id: impl Into<String>, actor: impl Into<String>, is_public: bool) -> Self {
    Self { paper_id: paper_id.into(), actor: actor.into(), is_public }
  }
}

#[async_trait]
impl DatabaseInstruction for SetVisibility {
  type Output = AuthoredPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (paper_id, actor, is_public) = (self.paper_id.clone(), self.actor.clone(), self.is_public);
    db.conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut paper = match fetch_owned_paper(&tx, &paper_id, &actor)? {
          Ok(paper) => paper,
          Err(e) => return Ok(Err(e)),
        };
        paper.is_public = is_public;
        paper.updated_at = Utc::now();
        store_paper(&tx, &paper)?;
        tx.commit()?;
        Ok(Ok(paper))
      })
      .await?
  }
}

/// A paper together with the draft its members work on.
#[derive(Debug, Clone)]
pub struct PaperDraft {
  pub paper:    AuthoredPaper,
  /// The saved content, or the default skeleton while nothing has been saved.
  pub content:  String,
  /// Whether the reader may save changes.
  pub can_save: bool,
}

/// Opens a paper's draft. Only its author and collaborators may.
pub struct OpenDraft {
  key:    PaperKey,
  reader: String,
}

impl OpenDraft {
  pub fn by_id(paper_id: impl Into<String>, reader: impl Into<String>) -> Self {
    Self { key: PaperKey::Id(paper_id.into()), reader: reader.into() }
  }

  pub fn by_urn(urn: Urn, reader: impl Into<String>) -> Self {
    Self { key: PaperKey::Urn(urn), reader: reader.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for OpenDraft {
  type Output = PaperDraft;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let key = self.key.clone();
    let paper = db
      .conn
      .call(move |conn| Ok(fetch_paper(conn, &key)?))
      .await?
      .ok_or_else(|| ScholiaError::NotFound("Paper".into()))?;
    if !paper.is_member(&self.reader) {
      return Err(ScholiaError::Unauthorized("You do not have access to this paper".into()));
    }
    let content = draft_content(&paper);
    let can_save = paper.is_author(&self.reader);
    Ok(PaperDraft { paper, content, can_save })
  }
}

/// Saves a paper's draft content. Collaborators may read the draft but only the author saves.
pub struct SaveContent {
  paper_id: String,
  actor:    String,
  content:  String,
}

impl SaveContent {
  pub fn new(paper_id: impl Into<String>, actor: impl Into<String>, content: impl Into<String>) -> Self {
    Self { paper_id: paper_id.into(), actor: actor.into(), content: content.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for SaveContent {
  type Output = AuthoredPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (paper_id, actor, content) = (self.paper_id.clone(), self.actor.clone(), self.content.clone());
    let saved = db
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let Some(mut paper) = fetch_paper(&tx, &PaperKey::Id(paper_id.clone()))? else {
          return Ok(Err(ScholiaError::NotFound(format!("Paper {paper_id}"))));
        };
        if !paper.is_author(&actor) {
          return Ok(Err(ScholiaError::Unauthorized("Only the first author can save changes".into())));
        }
        paper.content = Some(content);
        paper.updated_at = Utc::now();
        store_paper(&tx, &paper)?;
        tx.commit()?;
        Ok(Ok(paper))
      })
      .await??;
    debug!("Saved draft of {}", saved.urn);
    Ok(saved)
  }
}

/// Papers a user wrote or joined, newest first.
pub struct ListMyPapers {
  user_id: String,
}

impl ListMyPapers {
  pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: user_id.into() } }
}

#[async_trait]
impl DatabaseInstruction for ListMyPapers {
  type Output = Vec<AuthoredPaper>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let user_id = self.user_id.clone();
    Ok(
      db.conn
        .call(move |conn| {
          let mut stmt = conn.prepare_cached(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers
             WHERE author_id = ?1
                OR EXISTS (SELECT 1 FROM json_each(papers.collaborators) WHERE value = ?1)
             ORDER BY created_at DESC"
          ))?;
          let papers = stmt.query_map(params![user_id], paper_from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(papers)
        })
        .await?,
    )
  }
}

/// Searches public papers by title, abstract or motive substring, or exact topic tag.
pub struct SearchPublicPapers {
  query: String,
  limit: usize,
}

impl SearchPublicPapers {
  pub fn new(query: impl Into<String>) -> Self { Self { query: query.into(), limit: 10 } }

  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit = limit;
    self
  }
}

#[async_trait]
impl DatabaseInstruction for SearchPublicPapers {
  type Output = Vec<AuthoredPaper>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let query = self.query.trim().to_string();
    if query.is_empty() {
      return Ok(Vec::new());
    }
    let limit = self.limit as i64;
    Ok(
      db.conn
        .call(move |conn| {
          let pattern = format!("%{query}%");
          let mut stmt = conn.prepare_cached(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers
             WHERE is_public = 1
               AND (title LIKE ?1 OR abstract_text LIKE ?1 OR motive LIKE ?1
                    OR EXISTS (SELECT 1 FROM json_each(papers.topic_tags) WHERE value = ?2))
             ORDER BY created_at DESC
             LIMIT ?3"
          ))?;
          let papers = stmt
            .query_map(params![pattern, query, limit], paper_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(papers)
        })
        .await?,
    )
  }
}

/// The address to contact a paper's author at: the profile email, else the account email.
pub struct AuthorEmail {
  author_id: String,
}

impl AuthorEmail {
  pub fn of(author_id: impl Into<String>) -> Self { Self { author_id: author_id.into() } }
}

#[async_trait]
impl DatabaseInstruction for AuthorEmail {
  type Output = Option<String>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let author_id = self.author_id.clone();
    Ok(
      db.conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT COALESCE(NULLIF(TRIM(p.email), ''), u.email)
                 FROM users u LEFT JOIN profiles p ON p.user_id = u.id
                 WHERE u.id = ?1",
                params![author_id],
                |row| row.get::<_, String>(0),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }
}
