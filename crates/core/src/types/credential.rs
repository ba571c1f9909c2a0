//! Password credential material.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

/// A password value, either supplied at login or read off a remote record.
///
/// Wraps [`SecretString`] so the value never appears in `Debug` output or
/// log lines. Deserializes from a plain JSON string (the remote table
/// stores credentials that way); never serializes.
///
/// Comparison is plain equality, matching the remote store's semantics.
/// See DESIGN.md for the security flag on this.
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    /// Wrap a raw password string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }

    /// Compare against another password by equality.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }

    /// Expose the raw value for transmission to the remote store.
    ///
    /// Call sites should keep the exposure as narrow as possible.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[REDACTED]").finish()
    }
}

impl<'de> Deserialize<'de> for Password {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

impl From<&str> for Password {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_matches() {
        let a = Password::new("hunter2");
        let b = Password::new("hunter2");
        let c = Password::new("Hunter2");
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_debug_redacts() {
        let p = Password::new("hunter2");
        let out = format!("{p:?}");
        assert!(!out.contains("hunter2"));
        assert!(out.contains("REDACTED"));
    }

    #[test]
    fn test_deserialize_from_string() {
        let p: Password = serde_json::from_str("\"pw\"").unwrap();
        assert!(p.matches(&Password::new("pw")));
    }
}
