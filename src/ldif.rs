//! LDIF reader for bulk entry import.
//!
//! Supports the subset of RFC 2849 used by test fixtures: an optional
//! `version: 1` line, `#` comments, folded lines (continuation lines start
//! with one space), `attr: value` and base64 `attr:: value` lines, and
//! change records of type `add`. Records are separated by blank lines.

use crate::dn::{Dn, DnError};
use crate::entry::DirectoryEntry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LdifError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: invalid DN: {source}")]
    InvalidDn {
        line: usize,
        #[source]
        source: DnError,
    },

    #[error("line {line}: unsupported LDIF version '{version}'")]
    UnsupportedVersion { line: usize, version: String },

    #[error("line {line}: unsupported changetype '{change_type}'")]
    UnsupportedChangeType { line: usize, change_type: String },

    #[error("Cannot read LDIF file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LdifError {
    fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

/// One unfolded line and the physical line it started on.
struct LogicalLine {
    number: usize,
    text: String,
}

/// Parse every record of an LDIF document into entries.
pub fn parse_ldif(text: &str) -> Result<Vec<DirectoryEntry>, LdifError> {
    let mut entries = Vec::new();
    let mut first = true;
    for record in records(text) {
        let mut lines = record.as_slice();
        if first && let Some(version_line) = lines.first() {
            first = false;
            if let Some((name, value)) = split_line(version_line)?
                && name.eq_ignore_ascii_case("version")
            {
                if value != "1" {
                    return Err(LdifError::UnsupportedVersion {
                        line: version_line.number,
                        version: value,
                    });
                }
                lines = &lines[1..];
            }
        }
        if let Some(entry) = parse_record(lines)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Read and parse an LDIF file.
pub fn read_ldif_file(path: &Path) -> Result<Vec<DirectoryEntry>, LdifError> {
    let text = fs::read_to_string(path).map_err(|source| LdifError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_ldif(&text)
}

/// Unfold lines, drop comments and group the result into blank-line
/// separated records.
fn records(text: &str) -> Vec<Vec<LogicalLine>> {
    let mut records = Vec::new();
    let mut current: Vec<LogicalLine> = Vec::new();
    let mut in_comment = false;

    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        if let Some(continuation) = raw.strip_prefix(' ') {
            if in_comment {
                continue;
            }
            if let Some(last) = current.last_mut() {
                last.text.push_str(continuation);
                continue;
            }
        }
        if raw.trim().is_empty() {
            in_comment = false;
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }
        in_comment = raw.starts_with('#');
        if !in_comment {
            current.push(LogicalLine {
                number,
                text: raw.to_string(),
            });
        }
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}

/// Split `attr: value` / `attr:: base64`. `None` for lines without a colon.
fn split_line(line: &LogicalLine) -> Result<Option<(String, String)>, LdifError> {
    let Some((name, rest)) = line.text.split_once(':') else {
        return Ok(None);
    };
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(LdifError::syntax(line.number, "missing attribute name"));
    }

    if let Some(encoded) = rest.strip_prefix(':') {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| LdifError::syntax(line.number, format!("invalid base64 value: {e}")))?;
        let value = String::from_utf8(bytes).map_err(|_| {
            LdifError::syntax(line.number, "base64 value is not valid UTF-8 text")
        })?;
        return Ok(Some((name, value)));
    }
    if rest.starts_with('<') {
        return Err(LdifError::syntax(line.number, "URL values are not supported"));
    }
    Ok(Some((name, rest.trim_start_matches(' ').to_string())))
}

fn parse_record(lines: &[LogicalLine]) -> Result<Option<DirectoryEntry>, LdifError> {
    let Some((dn_line, rest)) = lines.split_first() else {
        return Ok(None);
    };
    let dn = match split_line(dn_line)? {
        Some((name, value)) if name.eq_ignore_ascii_case("dn") => {
            Dn::parse(&value).map_err(|source| LdifError::InvalidDn {
                line: dn_line.number,
                source,
            })?
        }
        _ => return Err(LdifError::syntax(dn_line.number, "record does not start with 'dn:'")),
    };

    let mut entry = DirectoryEntry::new(dn);
    for (position, line) in rest.iter().enumerate() {
        let Some((name, value)) = split_line(line)? else {
            return Err(LdifError::syntax(line.number, "expected 'attribute: value'"));
        };
        if name.eq_ignore_ascii_case("changetype") {
            if position != 0 || !value.trim().eq_ignore_ascii_case("add") {
                return Err(LdifError::UnsupportedChangeType {
                    line: line.number,
                    change_type: value.trim().to_string(),
                });
            }
            continue;
        }
        if name.eq_ignore_ascii_case("control") {
            return Err(LdifError::syntax(line.number, "controls are not supported"));
        }
        entry.attributes.add_value(&name, value);
    }
    Ok(Some(entry))
}
