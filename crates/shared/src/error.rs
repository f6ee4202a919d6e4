use std::path::PathBuf;

/// Reasons a run could not be started
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Please enter a command to run")]
    EmptyCommand,

    #[error("Working directory does not exist: {}", path.display())]
    MissingWorkingDirectory { path: PathBuf },

    #[error("Error running command: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            SupervisorError::EmptyCommand.to_string(),
            "Please enter a command to run"
        );

        let err = SupervisorError::MissingWorkingDirectory {
            path: PathBuf::from("/nowhere"),
        };
        assert!(err.to_string().ends_with("/nowhere"));
    }
}
