//! NewType wrappers for strong typing across the identity service.
//!
//! These types prevent accidental mixing of semantically different strings
//! (e.g., presenting an access token where a refresh token is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a NewType wrapper with standard trait implementations.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the inner value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner String.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(
    /// Short-lived signed credential authorizing individual requests.
    ///
    /// Access tokens carry no server-side record; they are verified purely
    /// by signature and expiry. They are not independently revocable.
    AccessToken
);

newtype_string!(
    /// Long-lived signed credential exchanged for a new token pair.
    ///
    /// Only one refresh token per user is valid at a time: whichever string
    /// currently sits in the user record's `refresh_token` field. Rotation
    /// invalidates the previous value by overwrite.
    RefreshToken
);

newtype_string!(
    /// Case-normalized (lowercase) unique username.
    ///
    /// Normalization happens once at validation time; everything downstream
    /// can assume the stored form.
    Username
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newtype_roundtrip() {
        let token = AccessToken::new("abc123");
        assert_eq!(token.as_str(), "abc123");
        assert_eq!(token.to_string(), "abc123");
        assert_eq!(token.clone().into_inner(), "abc123");
    }

    #[test]
    fn test_newtype_serde_transparent() {
        let token = RefreshToken::new("xyz");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"xyz\"");

        let back: RefreshToken = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }

    #[test]
    fn test_newtype_from_impls() {
        let a: Username = "ada".into();
        let b = Username::from("ada".to_string());
        assert_eq!(a, b);
    }
}
