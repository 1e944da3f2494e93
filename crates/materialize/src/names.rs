use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MaterializeError, MaterializeResult};

/// What to do when a destination file name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Fail with [`MaterializeError::DestinationExists`].
    #[default]
    #[serde(alias = "error")]
    Error,
    /// Append `(n)` before the extension, using the smallest free `n >= 1`.
    #[serde(alias = "rename")]
    Rename,
    /// Replace the existing file.
    #[serde(alias = "overwrite")]
    Overwrite,
}

/// Decide the file name to write `base_name` under in `directory`.
pub fn resolve_destination_name(
    base_name: &str,
    directory: &Path,
    policy: CollisionPolicy,
) -> MaterializeResult<String> {
    validate_base_name(base_name)?;
    match policy {
        CollisionPolicy::Overwrite => Ok(base_name.to_owned()),
        CollisionPolicy::Error => {
            let path = directory.join(base_name);
            if is_taken(&path)? {
                Err(MaterializeError::DestinationExists { path })
            } else {
                Ok(base_name.to_owned())
            }
        }
        CollisionPolicy::Rename => next_free_name(base_name, directory),
    }
}

/// First free name in the sequence `base_name`, `stem(1).ext`,
/// `stem(2).ext`, ...
pub fn next_free_name(base_name: &str, directory: &Path) -> MaterializeResult<String> {
    validate_base_name(base_name)?;
    if !is_taken(&directory.join(base_name))? {
        return Ok(base_name.to_owned());
    }

    let (stem, extension) = split_extension(base_name);
    let mut index: u64 = 1;
    loop {
        let candidate = numbered_name(stem, extension, index);
        if !is_taken(&directory.join(&candidate))? {
            debug!(
                original = base_name,
                renamed = %candidate,
                directory = %directory.display(),
                "destination renamed"
            );
            return Ok(candidate);
        }
        index += 1;
    }
}

fn validate_base_name(base_name: &str) -> MaterializeResult<()> {
    if base_name.trim().is_empty() {
        return Err(MaterializeError::invalid_option(
            "file_name",
            "file name is empty",
        ));
    }
    if base_name.contains(['/', '\\']) || base_name == "." || base_name == ".." {
        return Err(MaterializeError::invalid_option(
            "file_name",
            format!("'{base_name}' is not a single path component"),
        ));
    }
    Ok(())
}

/// A name is taken when anything sits at it, a dangling symlink included.
fn is_taken(path: &Path) -> MaterializeResult<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(MaterializeError::io("inspect destination", path, source)),
    }
}

/// Split at the last dot. A leading dot (`.env`) is part of the stem.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn numbered_name(stem: &str, extension: Option<&str>, index: u64) -> String {
    match extension {
        Some(ext) => format!("{stem}({index}).{ext}"),
        None => format!("{stem}({index})"),
    }
}
