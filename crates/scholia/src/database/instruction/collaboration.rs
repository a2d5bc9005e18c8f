use rusqlite::TransactionBehavior;

use super::*;
use crate::{
  authored::AuthoredPaper,
  collaboration::{self, check_join},
  urn::Urn,
};

/// Joins the paper with a given URN as a collaborator.
///
/// The read, the checks and the write happen inside one `IMMEDIATE` transaction, and the write
/// only lands if the collaborator list is still the one that was checked. Two candidates racing
/// for the last slot therefore can't both get in.
pub struct JoinPaper {
  urn:       Urn,
  candidate: String,
}

impl JoinPaper {
  /// Typed input should be parsed into a [`Urn`] first, so a value of the wrong length is
  /// rejected before the store is touched.
  pub fn new(urn: Urn, candidate: impl Into<String>) -> Self {
    Self { urn, candidate: candidate.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for JoinPaper {
  type Output = AuthoredPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let key = PaperKey::Urn(self.urn.clone());
    let candidate = self.candidate.clone();

    let outcome = db
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let paper = fetch_paper(&tx, &key)?;
        if let Err(rejection) = check_join(paper.as_ref(), &candidate) {
          return Ok(Err(rejection));
        }
        let Some(mut paper) = paper else {
          return Ok(Err(collaboration::JoinRejection::PaperNotFound));
        };

        let checked = to_json(&paper.collaborators)?;
        paper.collaborators.push(candidate);
        paper.updated_at = Utc::now();
        let changed = tx.execute(
          "UPDATE papers SET collaborators = ?1, updated_at = ?2
           WHERE id = ?3 AND collaborators = ?4",
          params![to_json(&paper.collaborators)?, paper.updated_at, paper.id, checked],
        )?;
        if changed == 0 {
          // someone else changed the list between our read and write
          return Ok(Err(collaboration::JoinRejection::Full));
        }
        tx.commit()?;
        Ok(Ok(paper))
      })
      .await?;

    let paper = outcome?;
    debug!("{} joined {}", self.candidate, paper.urn);
    Ok(paper)
  }
}

/// Adds a user to a paper's allow-list. Only the author may.
pub struct AuthorizeCollaborator {
  paper_id: String,
  actor:    String,
  user_id:  String,
}

impl AuthorizeCollaborator {
  pub fn new(paper_id: impl Into<String>, actor: impl Into<String>, user_id: impl Into<String>) -> Self {
    Self { paper_id: paper_id.into(), actor: actor.into(), user_id: user_id.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for AuthorizeCollaborator {
  type Output = AuthoredPaper;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let user_id = self.user_id.trim().to_string();
    if user_id.is_empty() {
      return Err(ScholiaError::Validation("A user id is required".into()));
    }
    let (paper_id, actor) = (self.paper_id.clone(), self.actor.clone());

    db.conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut paper = match fetch_owned_paper(&tx, &paper_id, &actor)? {
          Ok(paper) => paper,
          Err(e) => return Ok(Err(e)),
        };
        if paper.is_author(&user_id) {
          return Ok(Err(ScholiaError::Validation("You cannot authorize yourself".into())));
        }
        if paper.collaborators_authorized.contains(&user_id) {
          return Ok(Err(ScholiaError::Validation("Duplicate UUIDs are not allowed".into())));
        }
        if paper.collaborators_authorized.len() >= paper.collaborators_needed as usize {
          return Ok(Err(ScholiaError::Validation("All collaborator slots are filled".into())));
        }

        paper.collaborators_authorized.push(user_id);
        paper.updated_at = Utc::now();
        store_paper(&tx, &paper)?;
        tx.commit()?;
        Ok(Ok(paper))
      })
      .await?
  }
}

/// Removes a user from both the allow-list and the active collaborators. Only the author may.
pub struct RevokeCollaborator {
  paper_id: String,
  actor:    String,
  user_id:  String,
}

impl RevokeCollaborator {
  pub fn new(paper_id: impl Into<String>, actor: impl Into<String>, user_id: impl Into<String>) -> Self {
    Self { paper_id: paper_id.into(), actor: actor.into(), user_id: user_id.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for RevokeCollaborator {
  /// The paper after the change, and whether the user was on either list.
  type Output = (AuthoredPaper, bool);

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let (paper_id, actor, user_id) = (self.paper_id.clone(), self.actor.clone(), self.user_id.clone());
    db.conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut paper = match fetch_owned_paper(&tx, &paper_id, &actor)? {
          Ok(paper) => paper,
          Err(e) => return Ok(Err(e)),
        };
        let changed = collaboration::revoke(&mut paper, &user_id);
        if changed {
          store_paper(&tx, &paper)?;
          tx.commit()?;
        }
        Ok(Ok((paper, changed)))
      })
      .await?
  }
}
