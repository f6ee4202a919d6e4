//! The payload handed back to the orchestrating agent.

use serde::{Deserialize, Serialize};

/// Appended to every submitted feedback so the agent keeps asking for more.
pub const FEEDBACK_REMINDER: &str =
    "After finishing the steps above, remember to call interactive_feedback.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    /// Everything the command console collected during the last run
    pub command_logs: String,
    pub interactive_feedback: String,
}

impl FeedbackResult {
    /// Feedback the user actually submitted. Adds the reminder line.
    pub fn submitted(command_logs: impl Into<String>, feedback: &str) -> Self {
        let feedback = feedback.trim();
        let interactive_feedback = if feedback.is_empty() {
            FEEDBACK_REMINDER.to_string()
        } else {
            format!("{}\n{}", feedback, FEEDBACK_REMINDER)
        };

        Self {
            command_logs: command_logs.into(),
            interactive_feedback,
        }
    }

    /// The console was closed without submitting anything.
    pub fn closed(command_logs: impl Into<String>) -> Self {
        Self {
            command_logs: command_logs.into(),
            interactive_feedback: String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submitted_appends_reminder() {
        let result = FeedbackResult::submitted("$ ls\n", "  looks good \n");
        assert_eq!(
            result.interactive_feedback,
            format!("looks good\n{}", FEEDBACK_REMINDER)
        );
        assert_eq!(result.command_logs, "$ ls\n");
    }

    #[test]
    fn test_empty_submission_is_just_reminder() {
        let result = FeedbackResult::submitted("", "   ");
        assert_eq!(result.interactive_feedback, FEEDBACK_REMINDER);
    }

    #[test]
    fn test_json_has_exactly_two_keys() {
        let json = FeedbackResult::closed("logs").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 2);
        assert_eq!(obj["command_logs"], "logs");
        assert_eq!(obj["interactive_feedback"], "");
    }
}
