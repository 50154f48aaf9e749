//! Working-directory provisioning and resource lookup.
//!
//! Every root is injectable: the working directory comes from the
//! configuration, the environment or a caller-supplied temp root, and resource
//! patterns resolve against an explicit directory. Tests never need to touch
//! the real temp dir or the process working directory.

use crate::config::ServiceConfig;
use crate::error::{LifecycleError, LifecycleResult};
use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Environment variable overriding the working directory.
pub const WORK_DIR_ENV: &str = "EMBEDDED_DIRECTORY_WORK_DIR";

/// Prefix of generated working directory names.
pub const WORK_DIR_PREFIX: &str = "embedded-directory-";

/// Errors resolving a resource pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid resource pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Cannot read resource directory '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Symlink loop at '{}' while resolving resource pattern", .path.display())]
    Loop { path: PathBuf },
}

/// Pick the working directory: explicit configuration, then
/// [`WORK_DIR_ENV`], then a fresh `embedded-directory-<uuid>` below the temp root.
pub fn resolve_working_dir(config: &ServiceConfig) -> PathBuf {
    if let Some(path) = &config.working_directory {
        return path.clone();
    }
    if let Some(path) = std::env::var_os(WORK_DIR_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }

    let root = config.temp_root.clone().unwrap_or_else(std::env::temp_dir);
    root.join(format!("{WORK_DIR_PREFIX}{}", uuid::Uuid::new_v4()))
}

/// Create `path`, refusing to reuse a directory that already exists.
pub fn provision_working_dir(path: &Path) -> LifecycleResult<()> {
    if path.exists() {
        return Err(LifecycleError::WorkingDirectoryConflict {
            path: path.to_path_buf(),
        });
    }

    fs::create_dir_all(path).map_err(|source| LifecycleError::Provisioning {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Provisioned working directory {}", path.display());
    Ok(())
}

/// Recursively delete `path`. A missing directory is not an error.
pub fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Every file below `root` whose path relative to `root` matches `pattern`,
/// sorted so that imports run in a stable order.
///
/// A pattern naming an existing file directly (absolute, or relative to
/// `root`) matches just that file.
pub fn resolve_pattern(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, PatternError> {
    let direct = root.join(pattern);
    if direct.is_file() {
        return Ok(vec![direct]);
    }

    let matcher = compile(pattern)?;
    let mut matches = Vec::new();
    walk(root, &matcher, &mut matches)?;
    matches.sort();
    Ok(matches)
}

fn compile(pattern: &str) -> Result<GlobMatcher, PatternError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|source| PatternError::Invalid {
            pattern: pattern.to_string(),
            source,
        })
}

fn walk(root: &Path, matcher: &GlobMatcher, matches: &mut Vec<PathBuf>) -> Result<(), PatternError> {
    for item in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) if e.loop_ancestor().is_some() => {
                return Err(PatternError::Loop {
                    path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                });
            }
            Err(e) if e.depth() == 0 => {
                return Err(PatternError::Io {
                    path: root.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                log::warn!("Skipping unreadable resource path: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root)
            && matcher.is_match(relative)
        {
            matches.push(entry.into_path());
        }
    }
    Ok(())
}
