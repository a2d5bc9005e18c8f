use super::*;

#[traced_test]
#[tokio::test]
async fn test_sign_up_sign_in_cycle() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;

  let account = session.sign_up("ada@example.org", "hunter22", "Ada").await?;
  assert_eq!(session.account(), Some(&account));
  assert!(session.profile().is_none());

  let err = session.sign_up("ADA@example.org", "hunter22", "Imposter").await.unwrap_err();
  assert!(matches!(err, ScholiaError::DuplicateAccount(_)));

  session.sign_out().await?;
  assert!(matches!(session.require_account(), Err(ScholiaError::NotSignedIn)));
  assert!(matches!(session.library(None).await, Err(ScholiaError::NotSignedIn)));

  let err = session.sign_in("ada@example.org", "wrong-password").await.unwrap_err();
  assert!(matches!(err, ScholiaError::InvalidCredentials));
  let err = session.sign_in("nobody@example.org", "hunter22").await.unwrap_err();
  assert!(matches!(err, ScholiaError::InvalidCredentials));

  let again = session.sign_in("ada@example.org", "hunter22").await?;
  assert_eq!(again.id, account.id);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_session_survives_reopen() -> TestResult<()> {
  let dir = tempdir()?;
  let path = dir.path().join("scholia.db");

  let mut session = SessionStore::new(Database::open(&path).await?);
  let id = sign_up(&mut session, "Ada").await;
  session.toggle_save(&create_test_external("p1")).await?;
  drop(session);

  let mut session = SessionStore::new(Database::open(&path).await?);
  let restored = session.restore().await?.expect("session should be remembered");
  assert_eq!(restored.id, id);
  assert_eq!(session.profile().map(|p| p.username.as_str()), Some("Ada"));
  assert!(session.is_saved("p1"));

  session.sign_out().await?;
  let mut session = SessionStore::new(Database::open(&path).await?);
  assert!(session.restore().await?.is_none());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_profile_rules() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;
  let id = sign_up(&mut session, "Ada").await;

  let err = session.update_profile(Profile::new(&id, "  ")).await.unwrap_err();
  assert_eq!(err.to_string(), "Username is required");

  let too_many = Profile::new(&id, "Ada").with_topics(["a", "b", "c", "d", "e", "f"]);
  assert!(matches!(session.update_profile(too_many).await, Err(ScholiaError::Validation(_))));

  // the owner is always the signed-in user
  let saved = session.update_profile(Profile::new("someone-else", "Ada L.").with_topics(["nlp", ""])).await?;
  assert_eq!(saved.user_id, id);
  assert_eq!(saved.topics, vec!["nlp".to_string()]);
  assert_eq!(session.refresh_profile().await?, Some(saved));
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_paper_creation_needs_matching_signature() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;

  let form = create_test_form(2);
  let err = form.validate(None).unwrap_err();
  assert_eq!(err.to_string(), "Signature is required");

  sign_up(&mut session, "Ada").await;
  let mut form = create_test_form(2);
  form.signature = "Someone".into();
  assert_eq!(
    form.validate(session.profile()).unwrap_err().to_string(),
    "Signature must match your profile name"
  );

  let paper = create_test_paper(&mut session, 2).await;
  assert!(paper.urn.is_well_formed());
  assert!(!paper.is_public);
  assert_eq!(paper.topic_tags, vec!["cryptography".to_string(), "fhe".to_string()]);
  Ok(())
}
