//! Block reader for OpenLDAP-style schema files.
//!
//! Lines are trimmed and `#` comment lines dropped. Consecutive non-blank lines
//! form one block, joined with a single space; a blank line or the end of the
//! input closes the block. Each block starts with `attributetype` or
//! `objectclass` (any case) followed by the RFC 4512 description.

use super::parser::{parse_attribute_type, parse_object_class};
use super::types::{AttributeTypeDefinition, ObjectClassDefinition};
use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    AttributeType,
    ObjectClass,
    /// A block whose leading token is not recognised.
    Unknown(String),
}

/// One definition block and the line it started on (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaBlock {
    pub line: usize,
    pub kind: BlockKind,
    /// The description text following the leading keyword.
    pub definition: String,
}

/// A parsed schema element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDefinition {
    AttributeType(AttributeTypeDefinition),
    ObjectClass(ObjectClassDefinition),
}

impl SchemaBlock {
    fn classify(line: usize, text: String) -> Self {
        let (token, rest) = match text.split_once(char::is_whitespace) {
            Some((token, rest)) => (token, rest.trim()),
            None => (text.as_str(), ""),
        };
        let kind = match token.to_ascii_lowercase().as_str() {
            "attributetype" => BlockKind::AttributeType,
            "objectclass" => BlockKind::ObjectClass,
            _ => BlockKind::Unknown(token.to_string()),
        };
        Self {
            line,
            kind,
            definition: rest.to_string(),
        }
    }

    /// The LDAP attribute this block is written to on the subschema entry.
    pub fn subschema_attribute(&self) -> Option<&'static str> {
        match self.kind {
            BlockKind::AttributeType => Some("attributeTypes"),
            BlockKind::ObjectClass => Some("objectClasses"),
            BlockKind::Unknown(_) => None,
        }
    }

    /// Parse the block; `None` for unknown blocks.
    pub fn parse(&self, source: &str) -> Option<Result<SchemaDefinition, SchemaError>> {
        let origin = format!("{source}:{}", self.line);
        match self.kind {
            BlockKind::AttributeType => Some(
                parse_attribute_type(&origin, &self.definition).map(SchemaDefinition::AttributeType),
            ),
            BlockKind::ObjectClass => Some(
                parse_object_class(&origin, &self.definition).map(SchemaDefinition::ObjectClass),
            ),
            BlockKind::Unknown(_) => None,
        }
    }
}

pub fn parse_blocks(text: &str) -> Vec<SchemaBlock> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.starts_with('#') {
            continue;
        }
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(SchemaBlock::classify(start, current.join(" ")));
                current.clear();
            }
            continue;
        }
        if current.is_empty() {
            start = index + 1;
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(SchemaBlock::classify(start, current.join(" ")));
    }
    blocks
}
