//! The domain value persisted by the entry store.

use serde::{Deserialize, Serialize};

/// A user with an opaque payload.
///
/// Records are immutable values compared structurally; two records are equal
/// exactly when both fields are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomainRecord {
    username: String,
    special: String,
}

impl DomainRecord {
    pub fn new(username: impl Into<String>, special: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            special: special.into(),
        }
    }

    /// The identifying name. Doubles as the naming value of the stored entry.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn special(&self) -> &str {
        &self.special
    }
}
