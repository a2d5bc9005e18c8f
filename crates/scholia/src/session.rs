//! The signed-in user and their cached state.
//!
//! A [`SessionStore`] owns the [`Database`] and remembers who is signed in, their profile and
//! which external papers they have saved. Everything that needs a user goes through it and
//! fails with [`ScholiaError::NotSignedIn`] when nobody is.
//!
//! ```no_run
//! use scholia::{database::Database, session::SessionStore};
//!
//! # async fn example() -> scholia::error::Result<()> {
//! let mut session = SessionStore::new(Database::open(Database::default_path()).await?);
//! session.sign_in("ada@example.org", "correct horse").await?;
//! for tag in session.user_tags().await? {
//!   println!("{tag}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The token of the last sign-in is kept in the database's `config` table, so a later process
//! can pick the session up again with [`SessionStore::restore`].

use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};

use super::*;
use crate::{
  database::*,
  external::ExternalPaper,
  library::{SaveToggle, SavedPaper, TagCascade},
  profile::Profile,
};

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
  /// The account UUID, which is also what authors put on allow-lists.
  pub id:         String,
  /// Sign-in email, stored lowercase.
  pub email:      String,
  /// Name given at sign-up.
  pub full_name:  String,
  /// When the account was created.
  pub created_at: DateTime<Utc>,
}

/// Hashes a password with Argon2id and a random salt, in PHC string form.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Checks a password against a PHC hash. A mismatch is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
  let parsed = PasswordHash::new(hash)?;
  match Argon2::default().verify_password(password.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => Err(e.into()),
  }
}

#[derive(Debug, Clone)]
struct SignedIn {
  token:   String,
  account: Account,
}

/// Session state for one user of the local store.
#[derive(Debug)]
pub struct SessionStore {
  db:        Database,
  current:   Option<SignedIn>,
  profile:   Option<Profile>,
  saved_ids: BTreeSet<String>,
}

impl SessionStore {
  /// A signed-out session over `db`.
  pub fn new(db: Database) -> Self {
    Self { db, current: None, profile: None, saved_ids: BTreeSet::new() }
  }

  /// The underlying store, for instructions the session does not wrap.
  pub fn database(&mut self) -> &mut Database { &mut self.db }

  /// The signed-in account, if any.
  pub fn account(&self) -> Option<&Account> { self.current.as_ref().map(|s| &s.account) }

  /// The cached profile of the signed-in user.
  pub fn profile(&self) -> Option<&Profile> { self.profile.as_ref() }

  /// The current session token.
  pub fn token(&self) -> Option<&str> { self.current.as_ref().map(|s| s.token.as_str()) }

  /// The signed-in account, or [`ScholiaError::NotSignedIn`].
  pub fn require_account(&self) -> Result<&Account> { self.account().ok_or(ScholiaError::NotSignedIn) }

  fn user_id(&self) -> Result<String> { Ok(self.require_account()?.id.clone()) }

  /// Creates an account and signs it in.
  pub async fn sign_up(&mut self, email: &str, password: &str, full_name: &str) -> Result<Account> {
    let email = email.trim();
    if !email.contains('@') {
      return Err(ScholiaError::Validation("Please enter a valid email address".into()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
      return Err(ScholiaError::Validation(format!(
        "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
      )));
    }

    let account =
      CreateAccount::new(email, hash_password(password)?, full_name).execute(&mut self.db).await?;
    info!("Signed up {}", account.email);
    self.start(account).await
  }

  /// Signs in with an email and password.
  pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Account> {
    let credentials =
      FindAccount::by_email(email).execute(&mut self.db).await?.ok_or(ScholiaError::InvalidCredentials)?;
    if !verify_password(password, &credentials.password_hash)? {
      warn!("Failed sign-in for {email}");
      return Err(ScholiaError::InvalidCredentials);
    }
    self.start(credentials.account).await
  }

  async fn start(&mut self, account: Account) -> Result<Account> {
    let token = CreateSession::for_user(&account.id).execute(&mut self.db).await?;
    self.db.set_config_value(SESSION_TOKEN_KEY, &token).await?;
    self.current = Some(SignedIn { token, account: account.clone() });
    self.refresh().await?;
    Ok(account)
  }

  /// Picks up a session from its token.
  pub async fn resume(&mut self, token: &str) -> Result<Account> {
    let account =
      ResolveSession::new(token).execute(&mut self.db).await?.ok_or(ScholiaError::NotSignedIn)?;
    self.current = Some(SignedIn { token: token.to_string(), account: account.clone() });
    self.refresh().await?;
    Ok(account)
  }

  /// Picks up the session remembered by the last sign-in, if it is still valid.
  pub async fn restore(&mut self) -> Result<Option<Account>> {
    let Some(token) = self.db.config_value(SESSION_TOKEN_KEY).await? else {
      return Ok(None);
    };
    match self.resume(&token).await {
      Ok(account) => Ok(Some(account)),
      Err(ScholiaError::NotSignedIn) => {
        debug!("Remembered session is no longer valid");
        self.db.remove_config_value(SESSION_TOKEN_KEY).await?;
        Ok(None)
      },
      Err(e) => Err(e),
    }
  }

  /// Ends the session and forgets all cached state.
  pub async fn sign_out(&mut self) -> Result<()> {
    if let Some(signed_in) = self.current.take() {
      EndSession::new(&signed_in.token).execute(&mut self.db).await?;
      info!("Signed out {}", signed_in.account.email);
    }
    self.db.remove_config_value(SESSION_TOKEN_KEY).await?;
    self.profile = None;
    self.saved_ids.clear();
    Ok(())
  }

  async fn refresh(&mut self) -> Result<()> {
    self.refresh_profile().await?;
    self.refresh_saved_ids().await?;
    Ok(())
  }

  /// Reloads the profile from the store.
  pub async fn refresh_profile(&mut self) -> Result<Option<Profile>> {
    let user_id = self.user_id()?;
    self.profile = GetProfile::for_user(user_id).execute(&mut self.db).await?;
    Ok(self.profile.clone())
  }

  /// Reloads the set of saved paper ids from the store.
  pub async fn refresh_saved_ids(&mut self) -> Result<BTreeSet<String>> {
    let user_id = self.user_id()?;
    self.saved_ids = SavedIds::for_user(user_id).execute(&mut self.db).await?;
    Ok(self.saved_ids.clone())
  }

  /// Ids of the papers in the library, as last loaded or changed through this session.
  pub fn saved_ids(&self) -> &BTreeSet<String> { &self.saved_ids }

  /// Whether `paper_id` is in the cached saved set.
  pub fn is_saved(&self, paper_id: &str) -> bool { self.saved_ids.contains(paper_id) }

  /// Validates and stores the profile for the signed-in user.
  pub async fn update_profile(&mut self, profile: Profile) -> Result<Profile> {
    let user_id = self.user_id()?;
    let profile = Profile { user_id, ..profile }.validate()?;
    SaveProfile::new(profile.clone()).execute(&mut self.db).await?;
    self.profile = Some(profile.clone());
    Ok(profile)
  }

  /// Saves or unsaves an external paper.
  pub async fn toggle_save(&mut self, paper: &ExternalPaper) -> Result<SaveToggle> {
    let user_id = self.user_id()?;
    let toggle = ToggleSave::new(user_id, paper.clone()).execute(&mut self.db).await?;
    match toggle {
      SaveToggle::Saved => self.saved_ids.insert(paper.id.clone()),
      SaveToggle::Unsaved => self.saved_ids.remove(&paper.id),
    };
    Ok(toggle)
  }

  /// Replaces the tags of a paper already in the library.
  pub async fn set_tags<I, S>(&mut self, paper_id: &str, tags: I) -> Result<SavedPaper>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    let user_id = self.user_id()?;
    SetTags::new(user_id, paper_id, tags).execute(&mut self.db).await
  }

  /// Tags a paper, saving it first if needed.
  pub async fn tag_paper<I, S>(&mut self, paper: &ExternalPaper, tags: I) -> Result<SavedPaper>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>, {
    let user_id = self.user_id()?;
    let saved = TagPaper::new(user_id, paper.clone(), tags).execute(&mut self.db).await?;
    self.saved_ids.insert(saved.paper_id.clone());
    Ok(saved)
  }

  /// The signed-in user's library, optionally filtered to one tag.
  pub async fn library(&mut self, tag: Option<&str>) -> Result<Vec<SavedPaper>> {
    let mut list = ListSaved::for_user(self.user_id()?);
    if let Some(tag) = tag {
      list = list.with_tag(tag);
    }
    list.execute(&mut self.db).await
  }

  /// Every tag used in the signed-in user's library.
  pub async fn user_tags(&mut self) -> Result<BTreeSet<String>> {
    let user_id = self.user_id()?;
    UserTags::for_user(user_id).execute(&mut self.db).await
  }

  /// Removes a tag from the whole library.
  pub async fn delete_tag(&mut self, tag: &str) -> Result<TagCascade> {
    let user_id = self.user_id()?;
    let cascade = DeleteTag::new(user_id, tag).execute(&mut self.db).await?;
    if !cascade.is_complete() {
      warn!("Tag \"{tag}\" could not be removed from {} papers", cascade.failed);
    }
    Ok(cascade)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn store() -> (SessionStore, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("scholia.db")).await.unwrap();
    (SessionStore::new(db), dir)
  }

  #[test]
  fn test_password_hashing() {
    let hash = hash_password("correct horse").unwrap();
    assert!(hash.starts_with("$argon2id$"));
    assert!(verify_password("correct horse", &hash).unwrap());
    assert!(!verify_password("wrong horse", &hash).unwrap());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_operations_need_a_user() {
    let (mut session, _dir) = store().await;
    assert!(matches!(session.user_tags().await, Err(ScholiaError::NotSignedIn)));
    assert_eq!(session.require_account().unwrap_err().to_string(), "Please sign in to continue");
  }

  #[traced_test]
  #[tokio::test]
  async fn test_sign_up_in_and_out() {
    let (mut session, _dir) = store().await;
    let account = session.sign_up("ada@example.org", "secret-pass", "Ada").await.unwrap();
    assert_eq!(session.account(), Some(&account));

    assert!(matches!(
      session.sign_up("ADA@example.org", "secret-pass", "Ada again").await,
      Err(ScholiaError::DuplicateAccount(_))
    ));

    session.sign_out().await.unwrap();
    assert!(session.account().is_none());
    assert!(session.restore().await.unwrap().is_none());

    assert!(matches!(
      session.sign_in("ada@example.org", "nope").await,
      Err(ScholiaError::InvalidCredentials)
    ));
    let again = session.sign_in("ada@example.org", "secret-pass").await.unwrap();
    assert_eq!(again.id, account.id);
  }

  #[traced_test]
  #[tokio::test]
  async fn test_restore_remembered_session() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scholia.db");

    let mut first = SessionStore::new(Database::open(&path).await.unwrap());
    let account = first.sign_up("grace@example.org", "hopper-1906", "Grace").await.unwrap();
    drop(first);

    let mut second = SessionStore::new(Database::open(&path).await.unwrap());
    assert_eq!(second.restore().await.unwrap(), Some(account));
  }

  #[tokio::test]
  async fn test_sign_up_validation() {
    let (mut session, _dir) = store().await;
    assert!(matches!(session.sign_up("not-an-email", "secret-pass", "X").await, Err(ScholiaError::Validation(_))));
    assert!(matches!(session.sign_up("x@example.org", "123", "X").await, Err(ScholiaError::Validation(_))));
  }
}
