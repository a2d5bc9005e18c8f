use scholia::library::{SaveToggle, TagCascade};

use super::*;

#[traced_test]
#[tokio::test]
async fn test_delete_tag_cascade() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;
  sign_up(&mut session, "Ada").await;

  session.tag_paper(&create_test_external("a"), ["nlp", "ml"]).await?;
  session.tag_paper(&create_test_external("b"), ["nlp"]).await?;
  session.tag_paper(&create_test_external("c"), ["cv"]).await?;
  assert_eq!(session.user_tags().await?.into_iter().collect::<Vec<_>>(), vec!["cv", "ml", "nlp"]);

  let cascade = session.delete_tag("nlp").await?;
  assert_eq!(cascade, TagCascade { updated: 2, failed: 0 });

  let library = session.library(None).await?;
  let tags_of = |id: &str| library.iter().find(|p| p.paper_id == id).map(|p| p.tags.clone());
  assert_eq!(tags_of("a"), Some(vec!["ml".to_string()]));
  assert_eq!(tags_of("b"), Some(vec![]));
  assert_eq!(tags_of("c"), Some(vec!["cv".to_string()]));
  assert!(!session.user_tags().await?.contains("nlp"));

  // unused tags are a no-op
  assert_eq!(session.delete_tag("nlp").await?, TagCascade::default());
  assert!(session.delete_tag("   ").await.is_err());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_resave_starts_untagged() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;
  sign_up(&mut session, "Ada").await;
  let paper = create_test_external("p1");

  assert_eq!(session.toggle_save(&paper).await?, SaveToggle::Saved);
  assert!(session.is_saved("p1"));
  session.set_tags("p1", ["reading", "nlp"]).await?;
  assert_eq!(session.library(Some("reading")).await?.len(), 1);

  assert_eq!(session.toggle_save(&paper).await?, SaveToggle::Unsaved);
  assert!(!session.is_saved("p1"));
  assert!(session.library(None).await?.is_empty());

  session.toggle_save(&paper).await?;
  let library = session.library(None).await?;
  assert_eq!(library.len(), 1);
  assert!(library[0].tags.is_empty());
  assert!(session.library(Some("reading")).await?.is_empty());
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_tagging_saves_implicitly() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;
  sign_up(&mut session, "Ada").await;
  let paper = create_test_external("p2");

  let err = session.set_tags("p2", ["nlp"]).await.unwrap_err();
  assert!(matches!(err, ScholiaError::NotFound(_)));

  let saved = session.tag_paper(&paper, [" nlp ", "", "nlp", "graphs"]).await?;
  assert_eq!(saved.tags, vec!["nlp".to_string(), "graphs".to_string()]);
  assert!(session.is_saved("p2"));
  assert_eq!(saved.to_external().title, paper.title);
  Ok(())
}

#[traced_test]
#[tokio::test]
async fn test_libraries_are_per_user() -> TestResult<()> {
  let (mut session, _dir) = create_test_session().await;
  sign_up(&mut session, "Ada").await;
  session.tag_paper(&create_test_external("shared"), ["nlp"]).await?;
  session.sign_out().await?;

  sign_up(&mut session, "Bob").await;
  assert!(!session.is_saved("shared"));
  assert!(session.library(None).await?.is_empty());
  assert_eq!(session.toggle_save(&create_test_external("shared")).await?, SaveToggle::Saved);
  assert!(session.user_tags().await?.is_empty());
  Ok(())
}
