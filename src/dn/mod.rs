//! Distinguished names.
//!
//! A [`Dn`] keeps the attribute types and values as they were written, plus a
//! normalized form used for equality, hashing and hierarchy checks. Matching is
//! case-insensitive and whitespace-insensitive, in line with the
//! `caseIgnoreMatch` rule every naming attribute in the built-in schema uses.
//!
//! # Examples
//!
//! ```rust
//! use embedded_directory::dn::Dn;
//!
//! let base: Dn = "dc=example,dc=com".parse().unwrap();
//! let user: Dn = "uid=Alice,ou=users,DC=Example,dc=com".parse().unwrap();
//!
//! assert!(user.is_within(&base));
//! assert_eq!(user.parent().unwrap().to_string(), "ou=users,DC=Example,dc=com");
//! ```

pub mod builder;
pub mod escape;

pub use builder::user_dn;
pub use escape::{escape_value, unescape_value};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A DN string that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid DN '{dn}': {reason}")]
pub struct DnError {
    pub dn: String,
    pub reason: String,
}

impl DnError {
    pub fn new(dn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            reason: reason.into(),
        }
    }
}

/// Canonical form of a directory string value: trimmed, inner whitespace
/// collapsed to one space, lowercased.
pub fn normalize_value(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One `type=value` pair inside an RDN.
#[derive(Debug, Clone)]
pub struct Ava {
    attribute: String,
    value: String,
}

impl Ava {
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// The unescaped value.
    pub fn value(&self) -> &str {
        &self.value
    }

    fn normalized(&self) -> String {
        format!(
            "{}={}",
            self.attribute.to_ascii_lowercase(),
            escape_value(&normalize_value(&self.value))
        )
    }
}

/// A relative distinguished name: one or more AVAs joined with `+`.
#[derive(Debug, Clone)]
pub struct Rdn {
    avas: Vec<Ava>,
    normalized: String,
}

impl Rdn {
    /// Single-valued RDN from a raw (unescaped) value.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::from_avas(vec![Ava {
            attribute: attribute.into(),
            value: value.into(),
        }])
    }

    fn from_avas(avas: Vec<Ava>) -> Self {
        let mut parts: Vec<String> = avas.iter().map(Ava::normalized).collect();
        parts.sort();
        Self {
            avas,
            normalized: parts.join("+"),
        }
    }

    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Attribute type of the first AVA.
    pub fn attribute(&self) -> &str {
        self.avas.first().map(Ava::attribute).unwrap_or_default()
    }

    /// Value of the first AVA.
    pub fn value(&self) -> &str {
        self.avas.first().map(Ava::value).unwrap_or_default()
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    fn parse(dn: &str, text: &str) -> Result<Self, DnError> {
        let mut avas = Vec::new();
        for part in split_unescaped(text, &['+']) {
            let (attribute, value) = part
                .split_once('=')
                .ok_or_else(|| DnError::new(dn, format!("'{}' has no '='", part.trim())))?;
            let attribute = attribute.trim();
            if attribute.is_empty()
                || !attribute
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            {
                return Err(DnError::new(dn, format!("invalid attribute type '{attribute}'")));
            }
            avas.push(Ava {
                attribute: attribute.to_string(),
                value: unescape_value(value).map_err(|e| DnError::new(dn, e.reason))?,
            });
        }
        Ok(Self::from_avas(avas))
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, ava) in self.avas.iter().enumerate() {
            if index > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}={}", ava.attribute, escape_value(&ava.value))?;
        }
        Ok(())
    }
}

/// A distinguished name, leaf RDN first.
#[derive(Debug, Clone)]
pub struct Dn {
    rdns: Vec<Rdn>,
    normalized: String,
}

impl Dn {
    /// The empty DN naming the root DSE.
    pub fn root() -> Self {
        Self::from_rdns(Vec::new())
    }

    pub fn parse(text: &str) -> Result<Self, DnError> {
        if text.trim().is_empty() {
            return Ok(Self::root());
        }
        let rdns = split_unescaped(text, &[',', ';'])
            .into_iter()
            .map(|rdn| Rdn::parse(text, rdn))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_rdns(rdns))
    }

    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let normalized = rdns
            .iter()
            .map(Rdn::normalized)
            .collect::<Vec<_>>()
            .join(",");
        Self { rdns, normalized }
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    pub fn depth(&self) -> usize {
        self.rdns.len()
    }

    /// The leaf RDN, or `None` for the root DN.
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    pub fn parent(&self) -> Option<Dn> {
        if self.is_root() {
            return None;
        }
        Some(Self::from_rdns(self.rdns[1..].to_vec()))
    }

    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// Treat `self` as relative to `base` and return the absolute DN.
    pub fn join(&self, base: &Dn) -> Dn {
        let mut rdns = self.rdns.clone();
        rdns.extend(base.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// True when `self` equals `ancestor` or lies beneath it.
    pub fn is_within(&self, ancestor: &Dn) -> bool {
        let Some(offset) = self.rdns.len().checked_sub(ancestor.rdns.len()) else {
            return false;
        };
        self.rdns[offset..] == ancestor.rdns[..]
    }

    /// True when `self` sits exactly one level below `parent`.
    pub fn is_child_of(&self, parent: &Dn) -> bool {
        self.rdns.len() == parent.rdns.len() + 1 && self.is_within(parent)
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, rdn) in self.rdns.iter().enumerate() {
            if index > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Dn {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Dn::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Split on any of `separators` that is not preceded by a backslash escape.
fn split_unescaped<'a>(text: &'a str, separators: &[char]) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (index, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if separators.contains(&c) {
            parts.push(&text[start..index]);
            start = index + c.len_utf8();
        }
    }
    parts.push(&text[start..]);
    parts
}
