//! Services behind the feedback console: per-project settings, project
//! directory resolution, and the feedback output file.

pub mod feedback_output;
pub mod project_dir;
pub mod settings_store;

pub use feedback_output::write_feedback;
pub use project_dir::resolve_project_directory;
pub use settings_store::{project_group_name, JsonSettingsStore, SettingsRepository};
