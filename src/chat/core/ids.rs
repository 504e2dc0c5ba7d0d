//! Identifier types for the chat subsystem.
//!
//! This module is intentionally **type-heavy** and **logic-light**: it
//! provides validated string newtypes for the identifiers the marketplace
//! routes hand to the chat view, plus the session context object that
//! carries the signed-in user explicitly instead of reading ambient
//! application state.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chat::core::errors::{ChatError, ChatResult};

/// Declare a validated string newtype with a consistent API.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, label = $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            ///
            /// # Errors
            /// Returns an error if the raw value is empty or whitespace.
            pub fn new(raw: impl Into<String>) -> ChatResult<Self> {
                let raw = raw.into();
                if raw.trim().is_empty() {
                    return Err(ChatError::InvalidId(format!(
                        "{} must not be empty",
                        $label
                    )));
                }
                Ok(Self(raw))
            }

            /// Borrow the underlying string.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Extract the underlying string.
            #[inline]
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ChatError;

            fn from_str(s: &str) -> ChatResult<Self> {
                Self::new(s)
            }
        }
    };
}

define_string_id!(
    /// Identifier of the seller a conversation belongs to.
    SellerId,
    label = "seller id"
);

define_string_id!(
    /// Identifier of the signed-in user.
    UserId,
    label = "user id"
);

impl SellerId {
    /// Derive the key-value storage key for this seller's history.
    #[must_use]
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

/// The signed-in user, passed explicitly to every component that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    user: UserId,
}

impl SessionContext {
    /// Create a session context for the given user.
    #[must_use]
    pub const fn new(user: UserId) -> Self {
        Self { user }
    }

    /// The user this session belongs to.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seller_id_storage_key() -> ChatResult<()> {
        let id = SellerId::new("s1")?;
        assert_eq!(id.storage_key("chat_"), "chat_s1");
        Ok(())
    }

    #[test]
    fn test_empty_ids_rejected() {
        assert!(SellerId::new("").is_err());
        assert!(SellerId::new("   ").is_err());
        assert!(UserId::new("").is_err());
    }

    #[test]
    fn test_session_context_carries_user() -> ChatResult<()> {
        let session = SessionContext::new(UserId::new("u-42")?);
        assert_eq!(session.user().as_str(), "u-42");
        Ok(())
    }
}
