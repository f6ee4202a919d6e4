//! Terminal front end for the supervisor.
//!
//! Plays the role of the GUI event loop: it polls the run every
//! [`POLL_INTERVAL`], echoes streamed lines, and waits for the user's
//! feedback to arrive on a channel.

use shared::settings::ProjectSettings;
use shared::{FeedbackResult, RunStatus, SupervisorError};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use supervisor::{Invocation, Supervisor, POLL_INTERVAL};
use tracing::{debug, info};

pub struct Console<W: Write> {
    supervisor: Supervisor,
    project_dir: PathBuf,
    out: W,
}

impl<W: Write> Console<W> {
    pub fn new(supervisor: Supervisor, project_dir: PathBuf, out: W) -> Self {
        Self {
            supervisor,
            project_dir,
            out,
        }
    }

    pub fn show_header(&mut self, prompt: &str, settings: &ProjectSettings) -> io::Result<()> {
        writeln!(self.out, "{}", prompt)?;
        writeln!(self.out, "Project: {}", self.project_dir.display())?;
        if settings.command_section_visible || !settings.run_command.is_empty() {
            writeln!(self.out, "Command: {}", settings.run_command)?;
            let auto = if settings.execute_automatically { "on" } else { "off" };
            writeln!(self.out, "Run automatically: {}", auto)?;
        }
        writeln!(
            self.out,
            "Type your feedback, then press Ctrl-D (Ctrl-Z on Windows) to submit.\n"
        )?;
        self.out.flush()
    }

    /// Start `command` in the project directory. Problems are shown to the
    /// user and logged, never returned.
    pub fn run_command(&mut self, command: &str) -> io::Result<bool> {
        let invocation = Invocation::new(command, self.project_dir.clone());
        match self.supervisor.start(invocation) {
            Ok(handle) => {
                info!(pid = handle.pid(), "command started");
                writeln!(self.out, "$ {}", command)?;
                Ok(true)
            }
            Err(e) => {
                // Spawn failures are already in the log
                if !matches!(e, SupervisorError::Spawn(_)) {
                    self.supervisor.append_log(format!("{}\n", e));
                }
                writeln!(self.out, "{}", e)?;
                Ok(false)
            }
        }
    }

    /// One tick of the event loop: poll, then echo whatever arrived.
    pub fn pump(&mut self) -> io::Result<Option<RunStatus>> {
        let Some(handle) = self.supervisor.handle_mut() else {
            return Ok(None);
        };

        let was_alive = handle.is_alive();
        let status = handle.poll();
        for line in handle.drain_lines() {
            self.out.write_all(line.text.as_bytes())?;
        }
        if was_alive {
            if let RunStatus::Exited(code) = status {
                writeln!(self.out, "\nProcess exited with code {}", code)?;
            }
        }
        self.out.flush()?;
        Ok(Some(status))
    }

    /// Keep pumping until feedback arrives. `None` means the input closed
    /// without a submission.
    pub fn wait_for_feedback(&mut self, feedback: &Receiver<String>) -> io::Result<Option<String>> {
        loop {
            self.pump()?;
            match feedback.try_recv() {
                Ok(text) => return Ok(Some(text)),
                Err(TryRecvError::Disconnected) => return Ok(None),
                Err(TryRecvError::Empty) => thread::sleep(POLL_INTERVAL),
            }
        }
    }

    /// Stop anything still running and build the payload.
    pub fn finish(mut self, feedback: Option<String>) -> FeedbackResult {
        if let Some(status) = self.supervisor.release() {
            debug!(?status, "run released");
        }
        let logs = self.supervisor.logs();
        match feedback {
            Some(text) => FeedbackResult::submitted(logs, &text),
            None => FeedbackResult::closed(logs),
        }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    fn console() -> Console<Vec<u8>> {
        Console::new(Supervisor::new(), PathBuf::from("."), Vec::new())
    }

    fn output(console: &Console<Vec<u8>>) -> String {
        String::from_utf8_lossy(console.output()).into_owned()
    }

    #[test]
    fn test_empty_command_is_reported() {
        let mut console = console();
        assert!(!console.run_command("  ").unwrap());
        assert!(output(&console).contains("Please enter a command to run"));
        assert_eq!(console.pump().unwrap(), None);

        let result = console.finish(None);
        assert_eq!(result.command_logs, "Please enter a command to run\n");
        assert_eq!(result.interactive_feedback, "");
    }

    #[test]
    fn test_header_shows_saved_command() {
        let mut console = console();
        let settings = ProjectSettings {
            run_command: "make test".into(),
            ..Default::default()
        };
        console.show_header("Done?", &settings).unwrap();

        let text = output(&console);
        assert!(text.starts_with("Done?\n"));
        assert!(text.contains("Command: make test"));
        assert!(text.contains("Run automatically: off"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_and_collect_feedback() {
        let mut console = console();
        assert!(console.run_command("echo hi").unwrap());

        let start = Instant::now();
        while console.pump().unwrap() == Some(RunStatus::Running) {
            assert!(start.elapsed() < Duration::from_secs(10));
            thread::sleep(Duration::from_millis(10));
        }
        // Let the readers hand over anything still in flight
        thread::sleep(Duration::from_millis(50));
        console.pump().unwrap();

        let text = output(&console);
        assert!(text.contains("$ echo hi\n"));
        assert!(text.contains("hi\n"));
        assert!(text.contains("Process exited with code 0"));

        let (tx, rx) = mpsc::channel();
        tx.send("works".to_string()).unwrap();
        let feedback = console.wait_for_feedback(&rx).unwrap();

        let result = console.finish(feedback);
        assert!(result.command_logs.starts_with("$ echo hi\nhi\n"));
        assert!(result.interactive_feedback.starts_with("works\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_closing_input_stops_running_command() {
        let mut console = console();
        console.run_command("echo start; sleep 30").unwrap();

        let (tx, rx) = mpsc::channel::<String>();
        drop(tx);
        assert_eq!(console.wait_for_feedback(&rx).unwrap(), None);

        let result = console.finish(None);
        assert!(result.command_logs.starts_with("$ echo start; sleep 30\n"));
        assert_eq!(result.interactive_feedback, "");
    }
}
