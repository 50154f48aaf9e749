//! Bind identities and stored password checking.
//!
//! Passwords written by the harness itself are stored as
//! `{SHA256}<base64 digest>`. Entries imported from LDIF may carry plain-text
//! `userPassword` values; those are compared verbatim.
//!
//! # Example Usage
//!
//! ```rust
//! use embedded_directory::auth::{hash_password, verify_password};
//!
//! let stored = hash_password("secret");
//! assert!(stored.starts_with("{SHA256}"));
//! assert!(verify_password(&stored, "secret"));
//! assert!(!verify_password(&stored, "Secret"));
//! assert!(verify_password("plain", "plain"));
//! ```

use crate::dn::Dn;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};

/// Scheme prefix of hashed `userPassword` values.
pub const SHA256_SCHEME: &str = "{SHA256}";

/// Hash `password` into the `{SHA256}` storage format.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{SHA256_SCHEME}{}", BASE64.encode(hasher.finalize()))
}

/// Whether `presented` matches one stored `userPassword` value.
pub fn verify_password(stored: &str, presented: &str) -> bool {
    let scheme_len = SHA256_SCHEME.len();
    if stored.len() > scheme_len
        && stored.is_char_boundary(scheme_len)
        && stored[..scheme_len].eq_ignore_ascii_case(SHA256_SCHEME)
    {
        let Ok(expected) = BASE64.decode(&stored[scheme_len..]) else {
            return false;
        };
        let mut hasher = Sha256::new();
        hasher.update(presented.as_bytes());
        return hasher.finalize().as_slice() == expected.as_slice();
    }
    stored == presented
}

/// Who a session is bound as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BindState {
    #[default]
    Anonymous,
    Authenticated(Dn),
}

impl BindState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, BindState::Authenticated(_))
    }

    /// The bound DN; the empty DN when anonymous.
    pub fn dn(&self) -> Dn {
        match self {
            BindState::Anonymous => Dn::root(),
            BindState::Authenticated(dn) => dn.clone(),
        }
    }
}
