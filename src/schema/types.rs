//! Attribute type and object class definitions (RFC 4512 section 4.1).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of an object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ObjectClassKind {
    Abstract,
    #[default]
    Structural,
    Auxiliary,
}

/// Application of an attribute type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum AttributeUsage {
    #[default]
    UserApplications,
    DirectoryOperation,
    DistributedOperation,
    DsaOperation,
}

impl AttributeUsage {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::UserApplications => "userApplications",
            Self::DirectoryOperation => "directoryOperation",
            Self::DistributedOperation => "distributedOperation",
            Self::DsaOperation => "dSAOperation",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        [
            Self::UserApplications,
            Self::DirectoryOperation,
            Self::DistributedOperation,
            Self::DsaOperation,
        ]
        .into_iter()
        .find(|usage| usage.keyword().eq_ignore_ascii_case(keyword))
    }

    pub fn is_operational(self) -> bool {
        self != Self::UserApplications
    }
}

/// An attribute type definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeTypeDefinition {
    pub oid: String,
    pub names: Vec<String>,
    pub description: Option<String>,
    pub obsolete: bool,
    pub superior: Option<String>,
    pub equality: Option<String>,
    pub ordering: Option<String>,
    pub substring: Option<String>,
    /// Syntax OID, including any `{length}` bound.
    pub syntax: Option<String>,
    pub single_value: bool,
    pub collective: bool,
    pub no_user_modification: bool,
    pub usage: AttributeUsage,
}

/// An object class definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectClassDefinition {
    pub oid: String,
    pub names: Vec<String>,
    pub description: Option<String>,
    pub obsolete: bool,
    pub superiors: Vec<String>,
    pub kind: ObjectClassKind,
    pub must: Vec<String>,
    pub may: Vec<String>,
}

impl AttributeTypeDefinition {
    /// First NAME, or the OID when the definition is unnamed.
    pub fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }

    pub fn is_operational(&self) -> bool {
        self.usage.is_operational()
    }
}

impl ObjectClassDefinition {
    pub fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }
}

fn write_names(f: &mut fmt::Formatter<'_>, names: &[String]) -> fmt::Result {
    match names {
        [] => Ok(()),
        [name] => write!(f, " NAME '{name}'"),
        names => {
            write!(f, " NAME (")?;
            for name in names {
                write!(f, " '{name}'")?;
            }
            write!(f, " )")
        }
    }
}

fn write_oids(f: &mut fmt::Formatter<'_>, keyword: &str, oids: &[String]) -> fmt::Result {
    match oids {
        [] => Ok(()),
        [oid] => write!(f, " {keyword} {oid}"),
        oids => write!(f, " {keyword} ( {} )", oids.join(" $ ")),
    }
}

fn write_description(f: &mut fmt::Formatter<'_>, description: &Option<String>) -> fmt::Result {
    match description {
        Some(text) => write!(
            f,
            " DESC '{}'",
            text.replace('\\', "\\5c").replace('\'', "\\27")
        ),
        None => Ok(()),
    }
}

impl fmt::Display for AttributeTypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {}", self.oid)?;
        write_names(f, &self.names)?;
        write_description(f, &self.description)?;
        if self.obsolete {
            write!(f, " OBSOLETE")?;
        }
        if let Some(superior) = &self.superior {
            write!(f, " SUP {superior}")?;
        }
        for (keyword, rule) in [
            ("EQUALITY", &self.equality),
            ("ORDERING", &self.ordering),
            ("SUBSTR", &self.substring),
            ("SYNTAX", &self.syntax),
        ] {
            if let Some(rule) = rule {
                write!(f, " {keyword} {rule}")?;
            }
        }
        if self.single_value {
            write!(f, " SINGLE-VALUE")?;
        }
        if self.collective {
            write!(f, " COLLECTIVE")?;
        }
        if self.no_user_modification {
            write!(f, " NO-USER-MODIFICATION")?;
        }
        if self.usage != AttributeUsage::UserApplications {
            write!(f, " USAGE {}", self.usage.keyword())?;
        }
        write!(f, " )")
    }
}

impl fmt::Display for ObjectClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "( {}", self.oid)?;
        write_names(f, &self.names)?;
        write_description(f, &self.description)?;
        if self.obsolete {
            write!(f, " OBSOLETE")?;
        }
        write_oids(f, "SUP", &self.superiors)?;
        let kind = match self.kind {
            ObjectClassKind::Abstract => "ABSTRACT",
            ObjectClassKind::Structural => "STRUCTURAL",
            ObjectClassKind::Auxiliary => "AUXILIARY",
        };
        write!(f, " {kind}")?;
        write_oids(f, "MUST", &self.must)?;
        write_oids(f, "MAY", &self.may)?;
        write!(f, " )")
    }
}
