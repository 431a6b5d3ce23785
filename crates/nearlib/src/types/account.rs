//! Account identifier with validation.

use std::fmt::{self, Display};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::ParseAccountIdError;

/// Shortest allowed named account id.
const MIN_LEN: usize = 2;
/// Longest allowed account id.
const MAX_LEN: usize = 64;

/// An account identifier on the ledger.
///
/// Account ids are opaque to the transaction pipeline: they key the key
/// store, the nonce tracker and every node query. They are immutable once
/// parsed.
///
/// Valid account ids:
/// - Named: `"alice.near"`, `"bob.test"`, `"test_contract_1700000000"`
/// - Implicit: 64 lowercase hex characters (the hex of an ed25519 public key)
///
/// # Examples
///
/// ```
/// use nearlib::AccountId;
///
/// let alice: AccountId = "alice.near".parse().unwrap();
/// assert_eq!(alice.parent().unwrap().as_str(), "near");
///
/// assert!("Alice.near".parse::<AccountId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Parse and validate an account id.
    pub fn new(s: impl Into<String>) -> Result<Self, ParseAccountIdError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    fn validate(s: &str) -> Result<(), ParseAccountIdError> {
        if s.is_empty() {
            return Err(ParseAccountIdError::Empty);
        }
        if s.len() > MAX_LEN {
            return Err(ParseAccountIdError::TooLong(s.to_string()));
        }
        if s.len() == 64 && s.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')) {
            return Ok(());
        }
        if s.len() < MIN_LEN {
            return Err(ParseAccountIdError::TooShort(s.to_string()));
        }

        if let Some(c) = s
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'))
        {
            return Err(ParseAccountIdError::InvalidChar(s.to_string(), c));
        }

        // Every dot-separated part must be non-empty and may not start or end
        // with a separator.
        for part in s.split('.') {
            let bad_edge = |c: char| c == '-' || c == '_';
            if part.is_empty()
                || part.starts_with(bad_edge)
                || part.ends_with(bad_edge)
                || part.contains("--")
                || part.contains("__")
            {
                return Err(ParseAccountIdError::InvalidFormat(s.to_string()));
            }
        }

        Ok(())
    }

    /// Whether this is an implicit (hex public key) account.
    pub fn is_implicit(&self) -> bool {
        self.0.len() == 64 && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Whether this is a top-level account like `"near"` or `"test"`.
    pub fn is_top_level(&self) -> bool {
        !self.is_implicit() && !self.0.contains('.')
    }

    /// Whether this account is a direct or nested sub-account of `parent`.
    pub fn is_sub_account_of(&self, parent: &AccountId) -> bool {
        self.0
            .strip_suffix(parent.as_str())
            .is_some_and(|prefix| prefix.len() > 1 && prefix.ends_with('.'))
    }

    /// The parent account (`"sub.alice.near"` → `"alice.near"`).
    pub fn parent(&self) -> Option<AccountId> {
        if self.is_implicit() {
            return None;
        }
        self.0
            .split_once('.')
            .map(|(_, parent)| AccountId(parent.to_string()))
    }

    /// Get as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountId {
    type Err = ParseAccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = ParseAccountIdError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = ParseAccountIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl BorshSerialize for AccountId {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for AccountId {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let s = String::deserialize_reader(reader)?;
        Self::new(s).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
