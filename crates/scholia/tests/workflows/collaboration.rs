use scholia::{
  authored::PaperEdit,
  collaboration::{self, dropped_populated_slots, CollaborationState, JoinRejection},
  database::{AuthorizeCollaborator, GetPaper, JoinPaper, RevokeCollaborator, UpdatePaper},
};

use super::*;

/// Signs up an author and two would-be collaborators, leaving the author signed in.
async fn setup_team() -> (SessionStore, TempDir, String, String, String) {
  let (mut session, dir) = create_test_session().await;
  let bob = sign_up(&mut session, "Bob").await;
  session.sign_out().await.unwrap();
  let carol = sign_up(&mut session, "Carol").await;
  session.sign_out().await.unwrap();
  let ada = sign_up(&mut session, "Ada").await;
  (session, dir, ada, bob, carol)
}

#[traced_test]
#[tokio::test]
async fn test_join_requires_allow_list() -> TestResult<()> {
  let (mut session, _dir, ada, bob, _carol) = setup_team().await;
  let paper = create_test_paper(&mut session, 2).await;
  let urn = paper.urn.clone();
  let db = session.database();

  let err = JoinPaper::new(urn.clone(), &bob).execute(db).await.unwrap_err();
  assert!(matches!(err, ScholiaError::Join(JoinRejection::NoneAuthorized)));
  assert!(err.to_string().starts_with("No collaborators are authorized for this project yet."));

  AuthorizeCollaborator::new(&paper.id, &ada, &bob).execute(db).await?;

  // the author is never on the allow-list
  let err = JoinPaper::new(urn.clone(), &ada).execute(db).await.unwrap_err();
  assert!(matches!(err, ScholiaError::Join(JoinRejection::NotAuthorized(_))));

  let err = JoinPaper::new("URN000000000".parse()?, &bob).execute(db).await.unwrap_err();
  assert_eq!(err.to_string(), "Invalid URN or paper not found");

  let joined = JoinPaper::new(format!("  {urn}  ").parse()?, &bob).execute(db).await?;
  assert_eq!(joined.collaborators, vec![bob.clone()]);
  assert_eq!(CollaborationState::of(&joined, &bob), CollaborationState::Joined);
  assert!(joined.is_member(&bob));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_authorize_rules() -> TestResult<()> {
  let (mut session, _dir, ada, bob, carol) = setup_team().await;
  let paper = create_test_paper(&mut session, 1).await;
  let db = session.database();

  let err = AuthorizeCollaborator::new(&paper.id, &bob, &carol).execute(db).await.unwrap_err();
  assert!(matches!(err, ScholiaError::Unauthorized(_)));

  let err = AuthorizeCollaborator::new(&paper.id, &ada, &ada).execute(db).await.unwrap_err();
  assert_eq!(err.to_string(), "You cannot authorize yourself");

  AuthorizeCollaborator::new(&paper.id, &ada, &bob).execute(db).await?;
  let err = AuthorizeCollaborator::new(&paper.id, &ada, &carol).execute(db).await.unwrap_err();
  assert_eq!(err.to_string(), "All collaborator slots are filled");

  let (paper, changed) = RevokeCollaborator::new(&paper.id, &ada, &bob).execute(db).await?;
  assert!(changed);
  AuthorizeCollaborator::new(&paper.id, &ada, &carol).execute(db).await?;
  let err = AuthorizeCollaborator::new(&paper.id, &ada, &carol).execute(db).await.unwrap_err();
  assert_eq!(err.to_string(), "Duplicate UUIDs are not allowed");
  Ok(())
}

#[test]
fn test_join_rejected_when_full() {
  let form = create_test_form(1);
  let mut paper = form.into_paper("ada");
  paper.collaborators_authorized = vec!["bob".into(), "carol".into()];

  collaboration::join(&mut paper, "bob").unwrap();
  assert_eq!(paper.open_slots(), 0);
  assert_eq!(collaboration::join(&mut paper, "carol"), Err(JoinRejection::Full));
  assert_eq!(collaboration::join(&mut paper, "bob"), Err(JoinRejection::AlreadyJoined));
  assert_eq!(CollaborationState::of(&paper, "carol"), CollaborationState::Authorized);
  assert_eq!(CollaborationState::of(&paper, "dave"), CollaborationState::Unauthorized);
}

#[traced_test]
#[tokio::test]
async fn test_shrinking_slots_drops_trailing_collaborator() -> TestResult<()> {
  let (mut session, _dir, ada, bob, carol) = setup_team().await;
  let paper = create_test_paper(&mut session, 3).await;
  let db = session.database();

  let mut edit = PaperEdit::from_paper(&paper);
  edit.set_slot(0, &bob)?;
  edit.set_slot(2, &carol)?;
  let update = UpdatePaper::new(&paper.id, &ada, edit).execute(db).await?;
  assert_eq!(update.paper.collaborators_authorized, vec![bob.clone(), carol.clone()]);
  for user in [&bob, &carol] {
    JoinPaper::new(paper.urn.clone(), user).execute(db).await?;
  }

  let current = GetPaper::by_id(&paper.id).execute(db).await?.unwrap();
  let mut edit = PaperEdit::from_paper(&current);
  edit.set_slot(1, "")?;
  edit.set_slot(2, &carol)?;
  edit.set_collaborators_needed(1);
  assert_eq!(edit.slots, vec![bob.clone(), String::new(), carol.clone()]);
  assert_eq!(dropped_populated_slots(&edit.slots, 1), vec![carol.clone()]);

  let update = UpdatePaper::new(&paper.id, &ada, edit).execute(db).await?;
  assert_eq!(update.removed, vec![carol.clone()]);
  assert_eq!(update.paper.collaborators_needed, 1);
  assert_eq!(update.paper.collaborators_authorized, vec![bob.clone()]);
  assert_eq!(update.paper.collaborators, vec![bob]);

  let err = JoinPaper::new(paper.urn.clone(), &carol).execute(db).await.unwrap_err();
  assert!(matches!(err, ScholiaError::Join(JoinRejection::NotAuthorized(_))));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_concurrent_joins_are_both_kept() -> TestResult<()> {
  let (mut session, dir, ada, bob, carol) = setup_team().await;
  let paper = create_test_paper(&mut session, 2).await;
  AuthorizeCollaborator::new(&paper.id, &ada, &bob).execute(session.database()).await?;
  AuthorizeCollaborator::new(&paper.id, &ada, &carol).execute(session.database()).await?;

  let path = dir.path().join("scholia.db");
  let mut first = Database::open(&path).await?;
  let mut second = Database::open(&path).await?;
  let bob_joins = JoinPaper::new(paper.urn.clone(), &bob);
  let carol_joins = JoinPaper::new(paper.urn.clone(), &carol);
  let (a, b) = tokio::join!(bob_joins.execute(&mut first), carol_joins.execute(&mut second));
  a?;
  b?;

  let mut stored = GetPaper::by_id(&paper.id).execute(session.database()).await?.unwrap();
  stored.collaborators.sort();
  let mut expected = vec![bob, carol];
  expected.sort();
  assert_eq!(stored.collaborators, expected);
  assert_eq!(stored.open_slots(), 0);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_last_slot_goes_to_exactly_one_joiner() -> TestResult<()> {
  let (mut session, dir, ada, bob, carol) = setup_team().await;
  // an allow-list longer than the slot count, as left behind by older edits
  let mut draft = create_test_form(1).into_paper(&ada);
  draft.collaborators_authorized = vec![bob.clone(), carol.clone()];
  let paper = CreatePaper::new(draft).execute(session.database()).await?;

  let path = dir.path().join("scholia.db");
  let mut first = Database::open(&path).await?;
  let mut second = Database::open(&path).await?;
  let bob_joins = JoinPaper::new(paper.urn.clone(), &bob);
  let carol_joins = JoinPaper::new(paper.urn.clone(), &carol);
  let (a, b) = tokio::join!(bob_joins.execute(&mut first), carol_joins.execute(&mut second));

  let (winner, loser) = match (a, b) {
    (Ok(joined), Err(e)) => (joined.collaborators, e),
    (Err(e), Ok(joined)) => (joined.collaborators, e),
    (a, b) => panic!("expected exactly one join to succeed, got {a:?} and {b:?}"),
  };
  assert!(matches!(loser, ScholiaError::Join(JoinRejection::Full)), "unexpected error {loser:?}");
  assert_eq!(winner.len(), 1);

  let stored = GetPaper::by_id(&paper.id).execute(session.database()).await?.unwrap();
  assert_eq!(stored.collaborators, winner);
  assert_eq!(stored.open_slots(), 0);
  Ok(())
}
