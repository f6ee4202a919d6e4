use shared::SupervisorError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A shell command plus where and with what environment to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: String,
    working_directory: PathBuf,
    /// Overrides layered on top of the effective environment
    environment: HashMap<String, String>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_directory: working_directory.into(),
            environment: HashMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment.extend(environment);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn environment(&self) -> &HashMap<String, String> {
        &self.environment
    }

    pub(crate) fn validate(&self) -> Result<(), SupervisorError> {
        if self.command.trim().is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }
        if !self.working_directory.is_dir() {
            return Err(SupervisorError::MissingWorkingDirectory {
                path: self.working_directory.clone(),
            });
        }
        Ok(())
    }

    /// Build the shell process. Stdin is closed; stdout and stderr are piped.
    pub(crate) fn to_command(&self, base_environment: HashMap<String, String>) -> Command {
        let (shell, shell_arg) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut command = Command::new(shell);
        command
            .arg(shell_arg)
            .arg(&self.command)
            .current_dir(&self.working_directory)
            .env_clear()
            .envs(base_environment)
            .envs(&self.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_blank_command_rejected() {
        let dir = TempDir::new().unwrap();
        let err = Invocation::new("   ", dir.path()).validate().unwrap_err();
        assert!(matches!(err, SupervisorError::EmptyCommand));
    }

    #[test]
    fn test_missing_directory_rejected() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone");
        let err = Invocation::new("ls", &gone).validate().unwrap_err();
        match err {
            SupervisorError::MissingWorkingDirectory { path } => assert_eq!(path, gone),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overrides_accumulate() {
        let inv = Invocation::new("env", ".")
            .with_env("A", "1")
            .with_environment(HashMap::from([("B".to_string(), "2".to_string())]));
        assert_eq!(inv.environment().len(), 2);
        assert!(inv.validate().is_ok());
    }
}
