//! Parser for RFC 4512 `AttributeTypeDescription` and
//! `ObjectClassDescription` values.
//!
//! Extensions (`X-...`) are accepted and discarded.

use super::types::{
    AttributeTypeDefinition, AttributeUsage, ObjectClassDefinition, ObjectClassKind,
};
use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Dollar,
    Quoted(String),
    Word(String),
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '$' => {
                chars.next();
                tokens.push(Token::Dollar);
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some('\\') => {
                            let hex: String = chars.by_ref().take(2).collect();
                            match hex.to_ascii_lowercase().as_str() {
                                "27" => value.push('\''),
                                "5c" => value.push('\\'),
                                other => return Err(format!("invalid escape '\\{other}'")),
                            }
                        }
                        Some(other) => value.push(other),
                        None => return Err("unterminated quoted string".to_string()),
                    }
                }
                tokens.push(Token::Quoted(value));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '$' | '\'') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

struct Cursor {
    tokens: Vec<Token>,
    position: usize,
}

impl Cursor {
    fn new(text: &str) -> Result<Self, String> {
        Ok(Self {
            tokens: tokenize(text)?,
            position: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn expect_open(&mut self) -> Result<(), String> {
        match self.next() {
            Some(Token::Open) => Ok(()),
            other => Err(format!("expected '(', found {}", describe(other.as_ref()))),
        }
    }

    fn word(&mut self, what: &str) -> Result<String, String> {
        match self.next() {
            Some(Token::Word(word)) => Ok(word),
            other => Err(format!("expected {what}, found {}", describe(other.as_ref()))),
        }
    }

    fn quoted(&mut self, what: &str) -> Result<String, String> {
        match self.next() {
            Some(Token::Quoted(value)) => Ok(value),
            other => Err(format!("expected quoted {what}, found {}", describe(other.as_ref()))),
        }
    }

    /// `'a'` or `( 'a' 'b' )`
    fn quoted_list(&mut self, what: &str) -> Result<Vec<String>, String> {
        if self.peek() != Some(&Token::Open) {
            return Ok(vec![self.quoted(what)?]);
        }
        self.next();
        let mut values = Vec::new();
        loop {
            match self.next() {
                Some(Token::Quoted(value)) => values.push(value),
                Some(Token::Close) => break,
                other => {
                    return Err(format!(
                        "expected quoted {what} or ')', found {}",
                        describe(other.as_ref())
                    ));
                }
            }
        }
        Ok(values)
    }

    /// `oid` or `( oid $ oid ... )`
    fn oid_list(&mut self) -> Result<Vec<String>, String> {
        if self.peek() != Some(&Token::Open) {
            return Ok(vec![self.word("OID")?]);
        }
        self.next();
        let mut oids = vec![self.word("OID")?];
        loop {
            match self.next() {
                Some(Token::Dollar) => oids.push(self.word("OID")?),
                Some(Token::Close) => break,
                other => {
                    return Err(format!("expected '$' or ')', found {}", describe(other.as_ref())));
                }
            }
        }
        Ok(oids)
    }

    /// Skip the value of an `X-` extension.
    fn skip_extension(&mut self) -> Result<(), String> {
        self.quoted_list("extension value").map(|_| ())
    }
}

fn describe(token: Option<&Token>) -> String {
    match token {
        None => "end of definition".to_string(),
        Some(Token::Open) => "'('".to_string(),
        Some(Token::Close) => "')'".to_string(),
        Some(Token::Dollar) => "'$'".to_string(),
        Some(Token::Quoted(value)) => format!("'{value}'"),
        Some(Token::Word(word)) => word.clone(),
    }
}

/// Parse an attribute type description.
///
/// `origin` names where the text came from and is only used in errors.
pub fn parse_attribute_type(
    origin: &str,
    text: &str,
) -> Result<AttributeTypeDefinition, SchemaError> {
    attribute_type(text).map_err(|message| SchemaError::parse(origin, message))
}

/// Parse an object class description.
pub fn parse_object_class(origin: &str, text: &str) -> Result<ObjectClassDefinition, SchemaError> {
    object_class(text).map_err(|message| SchemaError::parse(origin, message))
}

fn attribute_type(text: &str) -> Result<AttributeTypeDefinition, String> {
    let mut cursor = Cursor::new(text)?;
    cursor.expect_open()?;
    let mut definition = AttributeTypeDefinition {
        oid: cursor.word("numeric OID")?,
        ..Default::default()
    };

    loop {
        let keyword = match cursor.next() {
            Some(Token::Close) => break,
            Some(Token::Word(word)) => word.to_ascii_uppercase(),
            other => return Err(format!("expected keyword, found {}", describe(other.as_ref()))),
        };
        match keyword.as_str() {
            "NAME" => definition.names = cursor.quoted_list("name")?,
            "DESC" => definition.description = Some(cursor.quoted("description")?),
            "OBSOLETE" => definition.obsolete = true,
            "SUP" => definition.superior = Some(cursor.word("superior type")?),
            "EQUALITY" => definition.equality = Some(cursor.word("matching rule")?),
            "ORDERING" => definition.ordering = Some(cursor.word("matching rule")?),
            "SUBSTR" => definition.substring = Some(cursor.word("matching rule")?),
            "SYNTAX" => definition.syntax = Some(cursor.word("syntax OID")?),
            "SINGLE-VALUE" => definition.single_value = true,
            "COLLECTIVE" => definition.collective = true,
            "NO-USER-MODIFICATION" => definition.no_user_modification = true,
            "USAGE" => {
                let usage = cursor.word("usage")?;
                definition.usage = AttributeUsage::from_keyword(&usage)
                    .ok_or_else(|| format!("unknown usage '{usage}'"))?;
            }
            extension if extension.starts_with("X-") => cursor.skip_extension()?,
            other => return Err(format!("unknown keyword '{other}'")),
        }
    }

    if cursor.peek().is_some() {
        return Err("unexpected text after closing ')'".to_string());
    }
    if definition.superior.is_none() && definition.syntax.is_none() {
        return Err(format!(
            "attribute type {} needs either SUP or SYNTAX",
            definition.oid
        ));
    }
    Ok(definition)
}

fn object_class(text: &str) -> Result<ObjectClassDefinition, String> {
    let mut cursor = Cursor::new(text)?;
    cursor.expect_open()?;
    let mut definition = ObjectClassDefinition {
        oid: cursor.word("numeric OID")?,
        ..Default::default()
    };

    loop {
        let keyword = match cursor.next() {
            Some(Token::Close) => break,
            Some(Token::Word(word)) => word.to_ascii_uppercase(),
            other => return Err(format!("expected keyword, found {}", describe(other.as_ref()))),
        };
        match keyword.as_str() {
            "NAME" => definition.names = cursor.quoted_list("name")?,
            "DESC" => definition.description = Some(cursor.quoted("description")?),
            "OBSOLETE" => definition.obsolete = true,
            "SUP" => definition.superiors = cursor.oid_list()?,
            "ABSTRACT" => definition.kind = ObjectClassKind::Abstract,
            "STRUCTURAL" => definition.kind = ObjectClassKind::Structural,
            "AUXILIARY" => definition.kind = ObjectClassKind::Auxiliary,
            "MUST" => definition.must = cursor.oid_list()?,
            "MAY" => definition.may = cursor.oid_list()?,
            extension if extension.starts_with("X-") => cursor.skip_extension()?,
            other => return Err(format!("unknown keyword '{other}'")),
        }
    }

    if cursor.peek().is_some() {
        return Err("unexpected text after closing ')'".to_string());
    }
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attribute_type_with_all_fields() {
        let definition = parse_attribute_type(
            "test",
            "( 2.5.4.3 NAME ( 'cn' 'commonName' ) DESC 'RFC4519: common name' SUP name \
             EQUALITY caseIgnoreMatch SUBSTR caseIgnoreSubstringsMatch \
             SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{64} X-ORIGIN 'RFC 4519' )",
        )
        .unwrap();

        assert_eq!(definition.oid, "2.5.4.3");
        assert_eq!(definition.names, ["cn", "commonName"]);
        assert_eq!(definition.primary_name(), "cn");
        assert_eq!(definition.description.as_deref(), Some("RFC4519: common name"));
        assert_eq!(definition.superior.as_deref(), Some("name"));
        assert_eq!(definition.equality.as_deref(), Some("caseIgnoreMatch"));
        assert_eq!(
            definition.syntax.as_deref(),
            Some("1.3.6.1.4.1.1466.115.121.1.15{64}")
        );
        assert!(!definition.single_value);
    }

    #[test]
    fn test_parse_operational_attribute() {
        let definition = parse_attribute_type(
            "test",
            "( 2.5.18.1 NAME 'createTimestamp' EQUALITY generalizedTimeMatch \
             SYNTAX 1.3.6.1.4.1.1466.115.121.1.24 SINGLE-VALUE NO-USER-MODIFICATION \
             USAGE directoryOperation )",
        )
        .unwrap();
        assert!(definition.single_value);
        assert!(definition.no_user_modification);
        assert!(definition.is_operational());
    }

    #[test]
    fn test_parse_object_class() {
        let definition = parse_object_class(
            "test",
            "( 2.5.6.6 NAME 'person' SUP top STRUCTURAL MUST ( sn $ cn ) \
             MAY ( userPassword $ telephoneNumber $ seeAlso $ description ) )",
        )
        .unwrap();

        assert_eq!(definition.superiors, ["top"]);
        assert_eq!(definition.kind, ObjectClassKind::Structural);
        assert_eq!(definition.must, ["sn", "cn"]);
        assert_eq!(definition.may.len(), 4);
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let text = "( 1.3.6.1.4.1.32473.1.2.1 NAME 'specialUser' DESC 'it''s special' \
                    SUP inetOrgPerson STRUCTURAL MAY special )"
            .replace("''", "\\27");
        let definition = parse_object_class("test", &text).unwrap();
        assert_eq!(definition.description.as_deref(), Some("it's special"));

        let rendered = definition.to_string();
        assert_eq!(parse_object_class("rendered", &rendered).unwrap(), definition);
    }

    #[test]
    fn test_parse_errors_carry_origin() {
        let error = parse_attribute_type("example.schema:3", "( 1.2.3 NAME 'broken' ").unwrap_err();
        assert!(matches!(error, SchemaError::Parse { ref origin, .. } if origin == "example.schema:3"));

        assert!(parse_attribute_type("x", "( 1.2.3 NAME 'nosyntax' )").is_err());
        assert!(parse_object_class("x", "( 1.2.3 BOGUS )").is_err());
        assert!(parse_object_class("x", "1.2.3 NAME 'x'").is_err());
    }
}
