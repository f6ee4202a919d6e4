pub mod error;
pub mod events;
pub mod feedback;

pub use error::SupervisorError;
pub use events::{OutputLine, RunStatus, StreamKind};
pub use feedback::FeedbackResult;

pub mod settings {
    use serde::{Deserialize, Serialize};

    pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash-latest";

    fn default_vision_model() -> String {
        DEFAULT_VISION_MODEL.to_string()
    }

    /// Credentials for the image-description service
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct VisionSettings {
        #[serde(default)]
        pub api_key: String,
        #[serde(default = "default_vision_model")]
        pub model: String,
        /// HTTP(S) proxy used only for vision requests
        #[serde(default)]
        pub proxy: String,
    }

    impl Default for VisionSettings {
        fn default() -> Self {
            Self {
                api_key: String::new(),
                model: default_vision_model(),
                proxy: String::new(),
            }
        }
    }

    impl VisionSettings {
        pub fn has_api_key(&self) -> bool {
            !self.api_key.trim().is_empty()
        }
    }

    /// Per-project settings, persisted under the project's group name
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ProjectSettings {
        /// Last command the user ran for this project
        #[serde(default)]
        pub run_command: String,
        /// Run `run_command` as soon as the console opens
        #[serde(default)]
        pub execute_automatically: bool,
        #[serde(default)]
        pub command_section_visible: bool,
        #[serde(default)]
        pub vision: VisionSettings,
    }

    impl ProjectSettings {
        /// Whether there is a command worth auto-running
        pub fn should_auto_run(&self) -> bool {
            self.execute_automatically && !self.run_command.trim().is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::settings::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: ProjectSettings =
            serde_json::from_str(r#"{"run_command": "cargo test"}"#).unwrap();

        assert_eq!(settings.run_command, "cargo test");
        assert!(!settings.execute_automatically);
        assert_eq!(settings.vision.model, DEFAULT_VISION_MODEL);
        assert!(!settings.vision.has_api_key());
    }

    #[test]
    fn test_auto_run_needs_command() {
        let mut settings = ProjectSettings {
            execute_automatically: true,
            ..Default::default()
        };
        assert!(!settings.should_auto_run());

        settings.run_command = "make".into();
        assert!(settings.should_auto_run());
    }
}
