//! # Schema Fragment Checker
//!
//! Checks custom `*.schema` files against the built-in directory schema
//! before they are handed to the harness through `schema_pattern`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin schema-check test-resources/custom.schema
//! cargo run --bin schema-check ./test-resources/
//! ```
//!
//! Every file is loaded together with the built-in schemas, honouring the
//! `# schema:`, `# depends:` and `# disabled:` headers, so a fragment may use
//! any attribute or class of `core`, `cosine`, `inetorgperson`, `nis` or the
//! harness schema, and fragments checked together may depend on each other.
//!
//! Set `RUST_LOG=debug` to see the loader's progress.
//!
//! ## Output
//!
//! ```text
//! Checking 2 schema file(s)
//!
//!   ✓ colours (test-resources/colours.schema): 2 attribute type(s), 1 object class(es)
//!   ❌ broken (test-resources/broken.schema)
//!       test-resources/broken.schema:4: cannot parse definition: missing NAME
//!
//! Summary:
//!   Valid files: 1
//!   Invalid files: 1
//! ```
//!
//! ## Exit Codes
//!
//! - `0`: every file loaded cleanly
//! - `1`: at least one file has errors, or the arguments were wrong

use embedded_directory::error::SchemaError;
use embedded_directory::schema::embedded::builtin_schemas;
use embedded_directory::schema::fragment::{BlockKind, parse_blocks};
use embedded_directory::schema::loader::{SCHEMA_EXTENSION, SchemaFile, load_files};
use embedded_directory::schema::SchemaRegistry;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use walkdir::WalkDir;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <schema-file-or-directory>...", args[0]);
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  {} test-resources/custom.schema", args[0]);
        eprintln!("  {} ./test-resources/", args[0]);
        process::exit(1);
    }

    let mut paths = Vec::new();
    for arg in &args[1..] {
        match collect_paths(Path::new(arg)) {
            Ok(found) => paths.extend(found),
            Err(message) => {
                eprintln!("Error: {message}");
                process::exit(1);
            }
        }
    }
    if paths.is_empty() {
        eprintln!("Error: no .{SCHEMA_EXTENSION} files found");
        process::exit(1);
    }

    let mut files = Vec::new();
    for path in &paths {
        match read_schema_file(path) {
            Ok(file) => files.push(file),
            Err(message) => {
                eprintln!("Error: {message}");
                process::exit(1);
            }
        }
    }

    if !check_files(files) {
        process::exit(1);
    }
}

fn collect_paths(path: &Path) -> Result<Vec<PathBuf>, String> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(format!(
            "'{}' is not a valid file or directory",
            path.display()
        ));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| {
            path.extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| extension == SCHEMA_EXTENSION)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn read_schema_file(path: &Path) -> Result<SchemaFile, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("custom");
    Ok(SchemaFile::parse(name, path.display().to_string(), text))
}

fn builtin_files() -> Vec<SchemaFile> {
    builtin_schemas()
        .into_iter()
        .map(|(name, text)| SchemaFile::parse(name, format!("builtin:{name}"), text))
        .collect()
}

/// Load `files` on top of the built-in schemas and report per file.
fn check_files(files: Vec<SchemaFile>) -> bool {
    println!("Checking {} schema file(s)", files.len());
    println!();

    let builtin = match SchemaRegistry::with_builtin_schemas() {
        Ok(registry) => registry,
        Err(errors) => {
            eprintln!("❌ Built-in schemas failed to load:");
            for error in errors {
                eprintln!("    {error}");
            }
            return false;
        }
    };

    let mut registry = SchemaRegistry::new();
    let mut all_files = builtin_files();
    all_files.extend(files.iter().cloned());
    let errors = load_files(&mut registry, all_files);

    let mut valid = 0;
    let mut invalid = 0;
    for file in &files {
        let own_errors: Vec<&SchemaError> = errors
            .iter()
            .filter(|error| error_belongs_to(error, file))
            .collect();

        if file.disabled {
            println!("  - {} ({}): disabled, skipped", file.name, file.source);
        } else if own_errors.is_empty() {
            let (attribute_types, object_classes) = count_blocks(file);
            println!(
                "  ✓ {} ({}): {} attribute type(s), {} object class(es)",
                file.name, file.source, attribute_types, object_classes
            );
            valid += 1;
        } else {
            println!("  ❌ {} ({})", file.name, file.source);
            for error in own_errors {
                println!("      {error}");
            }
            invalid += 1;
        }
    }

    // Anything left over could not be attributed to one file, e.g. a name
    // clash with a built-in element.
    let unattributed: Vec<&SchemaError> = errors
        .iter()
        .filter(|error| !files.iter().any(|file| error_belongs_to(error, file)))
        .collect();
    if !unattributed.is_empty() {
        println!();
        println!("Other errors:");
        for error in &unattributed {
            println!("    {error}");
        }
    }

    println!();
    println!("Summary:");
    println!("  Valid files: {valid}");
    println!("  Invalid files: {invalid}");
    println!(
        "  Registry: {} attribute type(s), {} object class(es) ({} / {} built in)",
        registry.attribute_types().count(),
        registry.object_classes().count(),
        builtin.attribute_types().count(),
        builtin.object_classes().count()
    );

    invalid == 0 && unattributed.is_empty()
}

fn error_belongs_to(error: &SchemaError, file: &SchemaFile) -> bool {
    match error {
        SchemaError::Parse { origin, .. } => origin.starts_with(&format!("{}:", file.source)),
        SchemaError::MissingDependency { schema, .. } => schema.eq_ignore_ascii_case(&file.name),
        _ => parse_blocks(&file.text).iter().any(|block| {
            let text = error.to_string();
            block_names(&block.definition)
                .iter()
                .any(|name| text.contains(&format!("'{name}'")))
        }),
    }
}

fn count_blocks(file: &SchemaFile) -> (usize, usize) {
    parse_blocks(&file.text)
        .iter()
        .fold((0, 0), |(types, classes), block| match block.kind {
            BlockKind::AttributeType => (types + 1, classes),
            BlockKind::ObjectClass => (types, classes + 1),
            BlockKind::Unknown(_) => (types, classes),
        })
}

/// OID and NAMEs of one definition, good enough to match error messages.
fn block_names(definition: &str) -> Vec<String> {
    let tokens: Vec<&str> = definition
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|token| !token.is_empty())
        .collect();
    let mut names = Vec::new();
    if let Some(oid) = tokens.first() {
        names.push(oid.to_string());
    }
    if let Some(position) = tokens.iter().position(|token| *token == "NAME") {
        names.extend(
            tokens[position + 1..]
                .iter()
                .take_while(|token| token.starts_with('\''))
                .map(|token| token.trim_matches('\'').to_string()),
        );
    }
    names
}
