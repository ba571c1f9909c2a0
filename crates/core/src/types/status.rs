//! Account status for customer and admin records.

use serde::{Deserialize, Serialize};

/// Whether an account record may be used to log in.
///
/// The remote tables store this as a lowercase string column; an inactive
/// record fails login regardless of the supplied password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
}

impl AccountStatus {
    /// True when the account may log in.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(format!("invalid account status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_is_active() {
        assert!(AccountStatus::Active.is_active());
        assert!(!AccountStatus::Inactive.is_active());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&AccountStatus::Inactive).unwrap();
        assert_eq!(json, "\"inactive\"");
        let back: AccountStatus = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(back, AccountStatus::Active);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "active".parse::<AccountStatus>().unwrap(),
            AccountStatus::Active
        );
        assert!("disabled".parse::<AccountStatus>().is_err());
    }
}
