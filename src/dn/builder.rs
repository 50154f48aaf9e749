//! Deterministic naming for user entries.

use super::{Dn, Rdn};
use crate::error::MappingError;

/// Naming attribute of user entries.
pub const USER_RDN_ATTRIBUTE: &str = "uid";

/// Container that holds user entries, relative to the root suffix.
pub const USERS_CONTAINER: &str = "users";

/// Build the DN of the entry holding `username`, relative to the base DN:
/// `uid=<escaped username>,ou=users`.
///
/// Distinct usernames always produce distinct DN strings. Usernames that are
/// empty or consist only of whitespace and NUL characters are rejected, since
/// the directory would treat them as an empty naming value.
pub fn user_dn(username: &str) -> Result<Dn, MappingError> {
    if username.is_empty() {
        return Err(MappingError::invalid_identifier(username, "username is empty"));
    }
    if username.chars().all(|c| c.is_whitespace() || c == '\0') {
        return Err(MappingError::invalid_identifier(
            username,
            "username contains only whitespace or NUL characters",
        ));
    }

    Ok(users_container().child(Rdn::new(USER_RDN_ATTRIBUTE, username)))
}

/// `ou=users`, relative to the base DN.
pub fn users_container() -> Dn {
    Dn::from_rdns(vec![Rdn::new("ou", USERS_CONTAINER)])
}
