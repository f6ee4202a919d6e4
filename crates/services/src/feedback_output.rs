use anyhow::{Context, Result};
use shared::FeedbackResult;
use std::fs;
use std::path::Path;
use tracing::info;

/// Write the feedback payload as JSON, creating parent directories.
pub fn write_feedback(path: &Path, result: &FeedbackResult) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let json = result.to_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), "feedback written");
    Ok(())
}
