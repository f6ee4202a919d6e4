//! Turn the project directory the agent hands us into a usable path.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

/// Percent-decode, fix up Windows drive paths, make absolute, and require
/// that the directory exists.
pub fn resolve_project_directory(raw: &str) -> Result<PathBuf> {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let fixed = if cfg!(windows) {
        strip_drive_slash(&decoded)
    } else {
        decoded.as_str()
    };

    let path = PathBuf::from(fixed);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path)
    };

    if !absolute.is_dir() {
        bail!("Project directory does not exist: {}", absolute.display());
    }
    Ok(absolute)
}

/// `/d:/work` -> `d:/work`
fn strip_drive_slash(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() > 2 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        &path[1..]
    } else {
        path
    }
}
