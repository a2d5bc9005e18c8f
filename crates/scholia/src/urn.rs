//! Shareable identifiers for authored papers.
//!
//! A URN is the 12-character handle an author hands to prospective collaborators so they can
//! find and join a paper. It is minted client-side from the clock and a small random suffix:
//!
//! ```text
//! URN 482913 047
//! │   │      └─ random suffix, zero-padded to 3 digits
//! │   └─ last 6 digits of the epoch milliseconds
//! └─ literal prefix
//! ```
//!
//! Generation does not consult the store. Two papers minted in the same millisecond collide
//! with probability 1/1000, and the collision is only caught by the `UNIQUE` constraint on
//! `papers.urn`.

use rand::Rng;

use super::*;

/// Exact length of every URN.
pub const URN_LENGTH: usize = 12;

lazy_static! {
  static ref URN_SHAPE: Regex = Regex::new(r"^URN\d{9}$").unwrap();
}

/// A paper's human-shareable reference number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
  /// Mints a fresh URN from the current time and a random suffix.
  pub fn generate() -> Self {
    let millis = Utc::now().timestamp_millis().unsigned_abs();
    let suffix = rand::thread_rng().gen_range(0..1000);
    Self::generate_at(millis, suffix)
  }

  /// Builds the URN for a given clock reading and suffix.
  ///
  /// Suffixes above 999 wrap so the output always has nine digits.
  pub fn generate_at(epoch_millis: u64, suffix: u16) -> Self {
    Self(format!("URN{:06}{:03}", epoch_millis % 1_000_000, suffix % 1000))
  }

  /// Whether this URN has the exact `URN` + nine digits shape.
  ///
  /// Parsing only enforces the length, so a hand-typed value can pass [`FromStr`] and still
  /// fail here.
  pub fn is_well_formed(&self) -> bool { URN_SHAPE.is_match(&self.0) }

  /// The URN as text.
  pub fn as_str(&self) -> &str { &self.0 }

  /// Wraps a value without any checks, for lookups and rows already in the store.
  pub(crate) fn from_stored(value: impl Into<String>) -> Self { Self(value.into()) }
}

impl FromStr for Urn {
  type Err = ScholiaError;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    if s.chars().count() != URN_LENGTH {
      return Err(ScholiaError::InvalidUrn(format!(
        "URN must be exactly {URN_LENGTH} characters"
      )));
    }
    Ok(Self(s.to_string()))
  }
}

impl Display for Urn {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for Urn {
  fn as_ref(&self) -> &str { &self.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_generated_urn_shape() {
    for _ in 0..500 {
      let urn = Urn::generate();
      assert!(urn.is_well_formed(), "{urn} does not match URN + 9 digits");
      assert_eq!(urn.as_str().len(), URN_LENGTH);
    }
  }

  #[test]
  fn test_generate_at_pads() {
    assert_eq!(Urn::generate_at(1_700_000_000_042, 7).as_str(), "URN000042007");
    assert_eq!(Urn::generate_at(1_700_000_123_456, 999).as_str(), "URN123456999");
    assert_eq!(Urn::generate_at(5, 1000).as_str(), "URN000005000");
  }

  #[test]
  fn test_same_millisecond_differs_only_by_suffix() {
    let a = Urn::generate_at(1_700_000_555_555, 12);
    let b = Urn::generate_at(1_700_000_555_555, 13);
    assert_ne!(a, b);
    assert_eq!(a.as_str()[..9], b.as_str()[..9]);
  }

  #[test]
  fn test_parse_checks_length_only() {
    assert!("URN123456789".parse::<Urn>().is_ok());
    assert!(" URN123456789 ".parse::<Urn>().is_ok());

    let err = "URN1234".parse::<Urn>().unwrap_err();
    assert_eq!(err.to_string(), "URN must be exactly 12 characters");

    let loose: Urn = "abcdefghijkl".parse().unwrap();
    assert!(!loose.is_well_formed());
  }
}
