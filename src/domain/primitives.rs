//! Domain primitives: AccountId, Provider, Tier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External numeric game account id, stored string-keyed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create an AccountId from a numeric id.
    pub fn new(id: u64) -> Self {
        AccountId(id.to_string())
    }

    /// Wrap an id read back from storage, where it was written by this crate.
    pub(crate) fn from_stored(id: String) -> Self {
        AccountId(id)
    }

    /// Get the account id as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract an account reference from free text.
    ///
    /// Takes the leading run of ASCII digits after trimming; `"123 thanks"` yields
    /// `123`, `"thanks 123"` yields nothing. Zero is never a valid account.
    pub fn parse_reference(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        trimmed[..digits_end]
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(AccountId::new)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid account id: {0}")]
pub struct AccountIdParseError(pub String);

impl FromStr for AccountId {
    type Err = AccountIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountIdParseError(s.to_string()));
        }
        trimmed
            .parse::<u64>()
            .ok()
            .filter(|id| *id > 0)
            .map(AccountId::new)
            .ok_or_else(|| AccountIdParseError(s.to_string()))
    }
}

/// Payment provider that delivered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Afdian,
    Kofi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Afdian => "afdian",
            Provider::Kofi => "kofi",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "afdian" => Ok(Provider::Afdian),
            "kofi" => Ok(Provider::Kofi),
            _ => Err(()),
        }
    }
}

/// Membership tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Normal,
    Premium,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Normal => "normal",
            Tier::Premium => "premium",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Tier::Normal),
            "premium" => Ok(Tier::Premium),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_leading_digits() {
        assert_eq!(
            AccountId::parse_reference(" 136407523 "),
            Some(AccountId::new(136407523))
        );
        assert_eq!(
            AccountId::parse_reference("136407523 thank you"),
            Some(AccountId::new(136407523))
        );
        assert_eq!(AccountId::parse_reference("thanks 136407523"), None);
        assert_eq!(AccountId::parse_reference(""), None);
        assert_eq!(AccountId::parse_reference("0"), None);
    }

    #[test]
    fn test_from_str_rejects_non_numeric() {
        assert!(AccountId::from_str("123").is_ok());
        assert!(AccountId::from_str("12a").is_err());
        assert!(AccountId::from_str("").is_err());
        assert!(AccountId::from_str("-5").is_err());
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Premium).unwrap(), "\"premium\"");
        assert_eq!(Tier::from_str("Normal"), Ok(Tier::Normal));
    }

    #[test]
    fn test_provider_round_trip_str() {
        assert_eq!(Provider::from_str("kofi"), Ok(Provider::Kofi));
        assert_eq!(Provider::Afdian.to_string(), "afdian");
        assert!(Provider::from_str("paypal").is_err());
    }
}
