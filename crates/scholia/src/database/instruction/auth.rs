use rusqlite::ErrorCode;

use super::*;
use crate::session::Account;

/// An account together with its stored password hash.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub account:       Account,
  pub password_hash: String,
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
  Ok(Account {
    id:         row.get(0)?,
    email:      row.get(1)?,
    full_name:  row.get(2)?,
    created_at: row.get(3)?,
  })
}

/// Registers a new account. Emails are unique regardless of case.
pub struct CreateAccount {
  email:         String,
  password_hash: String,
  full_name:     String,
}

impl CreateAccount {
  pub fn new(
    email: impl Into<String>,
    password_hash: impl Into<String>,
    full_name: impl Into<String>,
  ) -> Self {
    Self { email: email.into(), password_hash: password_hash.into(), full_name: full_name.into() }
  }
}

#[async_trait]
impl DatabaseInstruction for CreateAccount {
  type Output = Account;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let account = Account {
      id:         uuid::Uuid::new_v4().to_string(),
      email:      self.email.trim().to_string(),
      full_name:  self.full_name.trim().to_string(),
      created_at: Utc::now(),
    };
    let password_hash = self.password_hash.clone();
    let row = account.clone();

    let inserted = db
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO users (id, email, password_hash, full_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![row.id, row.email, password_hash, row.full_name, row.created_at],
        ) {
          Ok(_) => Ok(true),
          Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation =>
            Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(ScholiaError::DuplicateAccount(account.email));
    }
    debug!("Created account {} for {}", account.id, account.email);
    Ok(account)
  }
}

/// Looks an account up by email, including its password hash.
pub struct FindAccount {
  email: String,
}

impl FindAccount {
  pub fn by_email(email: impl Into<String>) -> Self { Self { email: email.into() } }
}

#[async_trait]
impl DatabaseInstruction for FindAccount {
  type Output = Option<Credentials>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let email = self.email.trim().to_string();
    Ok(
      db.conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT id, email, full_name, created_at, password_hash
                 FROM users WHERE email = ?1",
                params![email],
                |row| Ok(Credentials { account: account_from_row(row)?, password_hash: row.get(4)? }),
              )
              .optional()?,
          )
        })
        .await?,
    )
  }
}

/// Issues a new session token for a user.
pub struct CreateSession {
  user_id: String,
}

impl CreateSession {
  pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: user_id.into() } }
}

#[async_trait]
impl DatabaseInstruction for CreateSession {
  type Output = String;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let token = uuid::Uuid::new_v4().to_string();
    let (user_id, row_token) = (self.user_id.clone(), token.clone());
    db.conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
          params![row_token, user_id, Utc::now()],
        )?;
        Ok(())
      })
      .await?;
    Ok(token)
  }
}

/// Finds the account a session token belongs to.
pub struct ResolveSession {
  token: String,
}

impl ResolveSession {
  pub fn new(token: impl Into<String>) -> Self { Self { token: token.into() } }
}

#[async_trait]
impl DatabaseInstruction for ResolveSession {
  type Output = Option<Account>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let token = self.token.clone();
    Ok(
      db.conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT u.id, u.email, u.full_name, u.created_at
                 FROM sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                account_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }
}

/// Invalidates a session token. Returns whether it existed.
pub struct EndSession {
  token: String,
}

impl EndSession {
  pub fn new(token: impl Into<String>) -> Self { Self { token: token.into() } }
}

#[async_trait]
impl DatabaseInstruction for EndSession {
  type Output = bool;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let token = self.token.clone();
    Ok(
      db.conn
        .call(move |conn| Ok(conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])? > 0))
        .await?,
    )
  }
}
