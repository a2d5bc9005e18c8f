//! Collaborator authorization and the URN join flow.
//!
//! For any (paper, user) pair the user is in one of three states:
//!
//! ```text
//!                 author fills a slot                 user submits URN
//! Unauthorized ───────────────────────▶ Authorized ───────────────────▶ Joined
//!       ▲                                                                  │
//!       └──────────────────── author clears the slot ──────────────────────┘
//! ```
//!
//! There is no way for a joined collaborator to leave on their own.
//!
//! The checks here are pure. The store runs [`check_join`] and [`join`] inside a single
//! immediate transaction so two candidates can never both take the last open slot.

use thiserror::Error;

use super::*;
use crate::authored::AuthoredPaper;

/// Why a join attempt was refused. The messages are shown to the candidate verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JoinRejection {
  /// No paper has this URN.
  #[error("Invalid URN or paper not found")]
  PaperNotFound,

  #[error(
    "No collaborators are authorized for this project yet. Contact the paper author to add your \
     UUID."
  )]
  /// The author has not authorized anyone yet.
  NoneAuthorized,

  /// Carries the candidate's id so they can pass it on to the author.
  #[error(
    "You are not authorized to join this project. Your UUID: {0} Contact the paper author and \
     provide this UUID."
  )]
  NotAuthorized(String),

  /// The candidate already joined.
  #[error("You are already a collaborator on this paper")]
  AlreadyJoined,

  /// The candidate wrote the paper.
  #[error("You cannot collaborate on your own paper")]
  OwnPaper,

  /// Every slot is taken.
  #[error("This paper already has the maximum number of collaborators")]
  Full,
}

/// Where a user stands with respect to one paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollaborationState {
  /// Not on the allow-list.
  Unauthorized,
  /// On the allow-list but not joined yet.
  Authorized,
  /// An active collaborator.
  Joined,
}

impl CollaborationState {
  /// Classifies `user_id` against `paper`. Joining wins over being authorized.
  pub fn of(paper: &AuthoredPaper, user_id: &str) -> Self {
    if paper.collaborators.iter().any(|id| id == user_id) {
      Self::Joined
    } else if paper.collaborators_authorized.iter().any(|id| id == user_id) {
      Self::Authorized
    } else {
      Self::Unauthorized
    }
  }
}

/// Runs the join checks in order and returns the first one that fails.
///
/// 1. the URN resolved to a paper
/// 2. the allow-list is not empty
/// 3. the candidate is on the allow-list
/// 4. the candidate has not joined already
/// 5. the candidate is not the author
/// 6. there is an open slot
pub fn check_join(
  paper: Option<&AuthoredPaper>,
  candidate: &str,
) -> core::result::Result<(), JoinRejection> {
  let paper = paper.ok_or(JoinRejection::PaperNotFound)?;
  if paper.collaborators_authorized.is_empty() {
    return Err(JoinRejection::NoneAuthorized);
  }
  if !paper.collaborators_authorized.iter().any(|id| id == candidate) {
    return Err(JoinRejection::NotAuthorized(candidate.to_string()));
  }
  if paper.collaborators.iter().any(|id| id == candidate) {
    return Err(JoinRejection::AlreadyJoined);
  }
  if paper.is_author(candidate) {
    return Err(JoinRejection::OwnPaper);
  }
  if paper.collaborators.len() >= paper.collaborators_needed as usize {
    return Err(JoinRejection::Full);
  }
  Ok(())
}

/// Checks and, on success, appends `candidate` to the paper's collaborators.
pub fn join(paper: &mut AuthoredPaper, candidate: &str) -> core::result::Result<(), JoinRejection> {
  check_join(Some(paper), candidate)?;
  paper.collaborators.push(candidate.to_string());
  paper.updated_at = Utc::now();
  Ok(())
}

/// Clears one allow-list entry and drops that user from the active collaborators.
///
/// Returns `false` when `user_id` was on neither list.
pub fn revoke(paper: &mut AuthoredPaper, user_id: &str) -> bool {
  let before = paper.collaborators.len() + paper.collaborators_authorized.len();
  paper.collaborators.retain(|id| id != user_id);
  paper.collaborators_authorized.retain(|id| id != user_id);
  let changed = before != paper.collaborators.len() + paper.collaborators_authorized.len();
  if changed {
    paper.updated_at = Utc::now();
  }
  changed
}

/// Resizes the allow-list slots when the number of wanted collaborators changes.
///
/// Growing pads with empty slots. Shrinking keeps `max(needed, last_populated + 1)` slots, so it
/// only ever trims trailing empties and will not reach `needed` when a populated slot sits past
/// it. `["A", "", "B"]` shrunk to one slot therefore stays `["A", "", "B"]`, and the later
/// [`finalize_authorizations`] cut to `needed` silently drops `"B"`.
/// [`dropped_populated_slots`] reports that loss.
pub fn resize_slots(slots: &[String], needed: usize) -> Vec<String> {
  let mut resized = slots.to_vec();
  if needed > resized.len() {
    resized.resize(needed, String::new());
  } else if needed < resized.len() {
    let populated_len = resized.iter().rposition(|slot| !slot.is_empty()).map_or(0, |i| i + 1);
    let new_len = needed.max(populated_len);
    if new_len < resized.len() {
      resized.truncate(new_len);
    }
  }
  resized
}

/// Populated slots at or beyond `needed` that [`finalize_authorizations`] will discard.
pub fn dropped_populated_slots(slots: &[String], needed: usize) -> Vec<String> {
  slots.iter().skip(needed).filter(|slot| !slot.trim().is_empty()).cloned().collect()
}

/// Turns edit-form slots into the stored allow-list.
///
/// Only the first `needed` slots count, blanks are skipped, and a repeated id rejects the
/// whole form.
pub fn finalize_authorizations(slots: &[String], needed: usize) -> Result<Vec<String>> {
  let filled: Vec<String> = slots
    .iter()
    .take(needed)
    .filter(|slot| !slot.trim().is_empty())
    .cloned()
    .collect();
  let unique: BTreeSet<&String> = filled.iter().collect();
  if unique.len() != filled.len() {
    return Err(ScholiaError::Validation("Duplicate UUIDs are not allowed".into()));
  }
  Ok(filled)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    authored::{NewPaper, Template},
    profile::Profile,
  };

  fn paper(needed: u32, authorized: &[&str], joined: &[&str]) -> AuthoredPaper {
    let form = NewPaper {
      title:                 "Graph Rewriting".into(),
      topic_tags:            "pl".into(),
      abstract_text:         "abstract".into(),
      motive:                "motive".into(),
      completion_percentage: 10,
      template:              Template::Ieee,
      collaborators_needed:  needed,
      agreement:             true,
      signature:             "owner".into(),
      is_public:             false,
    };
    form.validate(Some(&Profile::new("owner", "owner"))).unwrap();
    let mut paper = form.into_paper("owner");
    paper.collaborators_authorized = authorized.iter().map(|s| s.to_string()).collect();
    paper.collaborators = joined.iter().map(|s| s.to_string()).collect();
    paper
  }

  fn strings(slots: &[&str]) -> Vec<String> { slots.iter().map(|s| s.to_string()).collect() }

  #[test]
  fn test_missing_paper() {
    assert_eq!(check_join(None, "u1"), Err(JoinRejection::PaperNotFound));
  }

  #[test]
  fn test_empty_allow_list_rejects_everyone() {
    let p = paper(3, &[], &[]);
    for candidate in ["u1", "owner", ""] {
      assert_eq!(check_join(Some(&p), candidate), Err(JoinRejection::NoneAuthorized));
    }
    // still empty-allow-list even when the paper is already full
    let full = paper(1, &[], &["ghost"]);
    assert_eq!(check_join(Some(&full), "ghost"), Err(JoinRejection::NoneAuthorized));
  }

  #[test]
  fn test_not_on_allow_list_message() {
    let p = paper(2, &["u1"], &[]);
    let err = check_join(Some(&p), "u9").unwrap_err();
    assert_eq!(
      err.to_string(),
      "You are not authorized to join this project. Your UUID: u9 Contact the paper author and \
       provide this UUID."
    );
  }

  #[test]
  fn test_author_always_rejected() {
    let p = paper(3, &["owner", "u1"], &[]);
    assert_eq!(check_join(Some(&p), "owner"), Err(JoinRejection::OwnPaper));
  }

  #[test]
  fn test_capacity() {
    let mut p = paper(2, &["u1", "u2", "u3"], &[]);
    join(&mut p, "u1").unwrap();
    assert_eq!(check_join(Some(&p), "u1"), Err(JoinRejection::AlreadyJoined));
    join(&mut p, "u2").unwrap();
    assert_eq!(p.collaborators.len(), p.collaborators_needed as usize);
    assert_eq!(join(&mut p, "u3"), Err(JoinRejection::Full));
    assert_eq!(p.collaborators, vec!["u1", "u2"]);
  }

  #[test]
  fn test_state_transitions() {
    let mut p = paper(2, &[], &[]);
    assert_eq!(CollaborationState::of(&p, "u1"), CollaborationState::Unauthorized);
    p.collaborators_authorized.push("u1".into());
    assert_eq!(CollaborationState::of(&p, "u1"), CollaborationState::Authorized);
    join(&mut p, "u1").unwrap();
    assert_eq!(CollaborationState::of(&p, "u1"), CollaborationState::Joined);
    assert!(revoke(&mut p, "u1"));
    assert_eq!(CollaborationState::of(&p, "u1"), CollaborationState::Unauthorized);
    assert!(!revoke(&mut p, "u1"));
  }

  #[test]
  fn test_resize_grows_with_blanks() {
    assert_eq!(resize_slots(&strings(&["A"]), 3), strings(&["A", "", ""]));
  }

  #[test]
  fn test_resize_trims_trailing_blanks() {
    assert_eq!(resize_slots(&strings(&["A", "", ""]), 1), strings(&["A"]));
    assert_eq!(resize_slots(&strings(&["", "B", ""]), 1), strings(&["", "B"]));
  }

  #[test]
  fn test_shrink_three_to_one_loses_populated_slot() {
    let slots = strings(&["A", "", "B"]);
    let resized = resize_slots(&slots, 1);
    // the shrink step cannot get below the last populated slot
    assert_eq!(resized, strings(&["A", "", "B"]));

    // saving then cuts to one slot and "B" is gone
    assert_eq!(dropped_populated_slots(&resized, 1), strings(&["B"]));
    assert_eq!(finalize_authorizations(&resized, 1).unwrap(), strings(&["A"]));
  }

  #[test]
  fn test_finalize_authorizations() {
    let slots = strings(&["A", " ", "B", "C"]);
    assert_eq!(finalize_authorizations(&slots, 3).unwrap(), strings(&["A", "B"]));
    assert!(finalize_authorizations(&strings(&["A", "A"]), 2).is_err());
    // a duplicate beyond the cut is not counted
    assert!(finalize_authorizations(&strings(&["A", "B", "A"]), 2).is_ok());
  }
}
