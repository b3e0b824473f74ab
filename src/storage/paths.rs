//! Path validation for the storage sandbox.
//!
//! Caller-supplied paths go through two gates: a lexical clean that rejects
//! absolute paths and `..` escapes, then a filesystem check that resolves
//! symlinks and confirms the target still lives under the storage root.

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{ImageError, Result};

/// Lexically normalizes a caller-supplied relative path.
///
/// Backslashes are treated as separators, `.` segments are dropped and
/// `a/../b` collapses to `b`. Empty paths, absolute paths, NUL bytes and
/// any `..` that would climb above the root are rejected.
pub fn clean_relative(path: &str) -> Result<PathBuf> {
    if path.trim().is_empty() {
        return Err(ImageError::Validation("path must not be empty".to_string()));
    }
    if path.contains('\0') {
        return Err(ImageError::Security("path contains NUL byte".to_string()));
    }

    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') || Path::new(path).is_absolute() || has_drive_prefix(&normalized)
    {
        return Err(ImageError::Security(format!("absolute path rejected: {path}")));
    }

    let mut cleaned: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if cleaned.pop().is_none() {
                    return Err(ImageError::Security(format!(
                        "path traversal rejected: {path}"
                    )));
                }
            }
            other => cleaned.push(other),
        }
    }

    if cleaned.is_empty() {
        return Err(ImageError::Validation(format!("path resolves to nothing: {path}")));
    }

    Ok(cleaned.iter().collect())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Joins a cleaned relative path onto `base` and proves containment.
///
/// `base` must already be canonical. The deepest existing ancestor of the
/// target is canonicalized so a symlink pointing outside the root is caught
/// even when the leaf does not exist yet.
pub fn resolve_within(base: &Path, relative: &Path) -> Result<PathBuf> {
    let target = base.join(relative);
    let resolved = canonicalize_existing_prefix(&target)?;

    let inside = resolved
        .strip_prefix(base)
        .map(|rel| !rel.components().any(|c| matches!(c, Component::ParentDir)))
        .unwrap_or(false);

    if !inside {
        return Err(ImageError::Security(format!(
            "path escapes storage root: {}",
            relative.display()
        )));
    }
    Ok(target)
}

fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for segment in missing.iter().rev() {
                    resolved.push(segment);
                }
                return Ok(resolved);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let (Some(name), Some(parent)) = (existing.file_name(), existing.parent()) else {
                    return Err(ImageError::Security(format!(
                        "cannot resolve path: {}",
                        path.display()
                    )));
                };
                missing.push(name.to_os_string());
                existing = parent;
            }
            Err(err) => return Err(err.into()),
        }
    }
}
