use super::*;
use crate::profile::Profile;

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
  Ok(Profile {
    user_id:         row.get(0)?,
    username:        row.get(1)?,
    email:           row.get(2)?,
    contact_no:      row.get(3)?,
    profession:      row.get(4)?,
    university:      row.get(5)?,
    cv_url:          row.get(6)?,
    portfolio_link:  row.get(7)?,
    research_papers: json_column(row, 8)?,
    topics:          json_column(row, 9)?,
  })
}

/// Creates or replaces a profile.
pub struct SaveProfile {
  profile: Profile,
}

impl SaveProfile {
  pub fn new(profile: Profile) -> Self { Self { profile } }
}

#[async_trait]
impl DatabaseInstruction for SaveProfile {
  type Output = ();

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let profile = self.profile.clone();
    db.conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "INSERT INTO profiles (
               user_id, username, email, contact_no, profession, university,
               cv_url, portfolio_link, research_papers, topics, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT(user_id) DO UPDATE SET
               username = excluded.username,
               email = excluded.email,
               contact_no = excluded.contact_no,
               profession = excluded.profession,
               university = excluded.university,
               cv_url = excluded.cv_url,
               portfolio_link = excluded.portfolio_link,
               research_papers = excluded.research_papers,
               topics = excluded.topics,
               updated_at = excluded.updated_at",
        )?;
        stmt.execute(params![
          profile.user_id,
          profile.username,
          profile.email,
          profile.contact_no,
          profile.profession,
          profile.university,
          profile.cv_url,
          profile.portfolio_link,
          to_json(&profile.research_papers)?,
          to_json(&profile.topics)?,
          Utc::now(),
        ])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Fetches one user's profile.
pub struct GetProfile {
  user_id: String,
}

impl GetProfile {
  pub fn for_user(user_id: impl Into<String>) -> Self { Self { user_id: user_id.into() } }
}

#[async_trait]
impl DatabaseInstruction for GetProfile {
  type Output = Option<Profile>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let user_id = self.user_id.clone();
    Ok(
      db.conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT user_id, username, email, contact_no, profession, university,
                        cv_url, portfolio_link, research_papers, topics
                 FROM profiles WHERE user_id = ?1",
                params![user_id],
                profile_from_row,
              )
              .optional()?,
          )
        })
        .await?,
    )
  }
}

/// Maps user ids to display names. Ids without a profile are left out.
pub struct ProfileNames {
  user_ids: Vec<String>,
}

impl ProfileNames {
  pub fn of<I, S>(user_ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>, {
    Self { user_ids: user_ids.into_iter().map(Into::into).collect() }
  }
}

#[async_trait]
impl DatabaseInstruction for ProfileNames {
  type Output = BTreeMap<String, String>;

  async fn execute(&self, db: &mut Database) -> Result<Self::Output> {
    let user_ids = self.user_ids.clone();
    Ok(
      db.conn
        .call(move |conn| {
          let mut stmt = conn.prepare_cached("SELECT username FROM profiles WHERE user_id = ?1")?;
          let mut names = BTreeMap::new();
          for user_id in user_ids {
            if let Some(name) = stmt.query_row(params![user_id], |row| row.get::<_, String>(0)).optional()? {
              names.insert(user_id, name);
            }
          }
          Ok(names)
        })
        .await?,
    )
  }
}
