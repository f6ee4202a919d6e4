//! The run lifecycle: start, stream, poll, terminate.
//!
//! A [`Supervisor`] owns at most one [`RunHandle`]. The caller's event loop
//! drives it: call [`Supervisor::poll`] every [`POLL_INTERVAL`] and drain
//! lines with [`RunHandle::drain_lines`]. Nothing here owns a timer.

use crate::environment::{EnvironmentSource, InheritedEnvironment};
use crate::invocation::Invocation;
use crate::log_buffer::{LogBuffer, SharedLog};
use crate::process_tree;
use crate::reader;
use shared::{OutputLine, RunStatus, StreamKind, SupervisorError};
use std::io;
use std::process::Child;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How often a caller is expected to poll
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One invocation's lifecycle.
///
/// Dropping a handle that is still running tears down its process tree.
pub struct RunHandle {
    id: Uuid,
    pid: u32,
    command: String,
    /// `None` once the process has been reaped or handed to the reaper thread
    child: Option<Child>,
    status: RunStatus,
    lines: Receiver<OutputLine>,
    log: SharedLog,
    readers: Vec<JoinHandle<()>>,
    /// Exit code whose log notice waits for the readers to drain
    pending_notice: Option<i32>,
}

impl RunHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Last observed status; does not touch the process
    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        self.status.is_running()
    }

    /// Non-blocking liveness check.
    ///
    /// Once an exit is observed an informational line is added to the log,
    /// after both pipes have drained. Terminal states are sticky.
    pub fn poll(&mut self) -> RunStatus {
        if !self.status.is_terminal() {
            if let Some(child) = self.child.as_mut() {
                match child.try_wait() {
                    Ok(Some(exit)) => {
                        let code = exit.code().unwrap_or(-1);
                        self.status = RunStatus::Exited(code);
                        self.child = None;
                        self.pending_notice = Some(code);
                        info!(run_id = %self.id, pid = self.pid, code, "process exited");
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(run_id = %self.id, error = %e, "failed to query process status")
                    }
                }
            }
        }
        self.flush_exit_notice(false);
        self.status
    }

    /// Both reader threads are done, so no more lines will arrive
    pub fn output_finished(&self) -> bool {
        self.readers.iter().all(JoinHandle::is_finished)
    }

    /// Write the pending exit notice. Unless forced, waits for the readers so
    /// the notice lands after the last line.
    fn flush_exit_notice(&mut self, force: bool) {
        if self.pending_notice.is_none() || !(force || self.output_finished()) {
            return;
        }
        if let Some(code) = self.pending_notice.take() {
            self.log
                .lock()
                .push_notice(format!("\nProcess exited with code {}\n", code));
        }
    }

    /// Kill the process and every descendant found right now.
    ///
    /// No-op once the process has exited, even if no poll has seen it yet.
    /// Never blocks on the worker threads: they notice the closed pipes and
    /// stop by themselves.
    pub fn terminate(&mut self) {
        if self.poll().is_terminal() {
            return;
        }

        let report = process_tree::terminate_tree(self.pid);
        info!(
            run_id = %self.id,
            pid = self.pid,
            processes = report.enumerated,
            "run terminated"
        );
        self.status = RunStatus::Terminated;

        if let Some(mut child) = self.child.take() {
            let spawned = thread::Builder::new()
                .name("run-reaper".into())
                .spawn(move || {
                    let _ = child.wait();
                });
            if let Err(e) = spawned {
                debug!(error = %e, "could not spawn reaper thread");
            }
        }
    }

    /// Next line, blocking until one arrives. `None` once both pipes closed.
    pub fn next_line(&self) -> Option<OutputLine> {
        self.lines.recv().ok()
    }

    /// Everything delivered since the last drain, without blocking
    pub fn drain_lines(&self) -> Vec<OutputLine> {
        self.lines.try_iter().collect()
    }

    /// Blocking iterator over the run's lines; ends when both pipes close.
    pub fn lines(&self) -> impl Iterator<Item = OutputLine> + '_ {
        self.lines.iter()
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.terminate();
        self.flush_exit_notice(true);
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("id", &self.id)
            .field("pid", &self.pid)
            .field("command", &self.command)
            .field("status", &self.status)
            .finish()
    }
}

/// Runs shell commands one at a time and keeps the combined log.
pub struct Supervisor {
    environment: Box<dyn EnvironmentSource>,
    log: SharedLog,
    current: Option<RunHandle>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_environment(InheritedEnvironment)
    }

    pub fn with_environment(environment: impl EnvironmentSource + 'static) -> Self {
        Self {
            environment: Box::new(environment),
            log: LogBuffer::shared(),
            current: None,
        }
    }

    /// Start `invocation`, replacing any active run.
    ///
    /// Invalid invocations are rejected before anything else happens. A
    /// spawn failure is written to the log and leaves the supervisor idle.
    pub fn start(&mut self, invocation: Invocation) -> Result<&mut RunHandle, SupervisorError> {
        invocation.validate()?;

        if let Some(mut previous) = self.current.take() {
            debug!(run_id = %previous.id, "stopping previous run");
            previous.terminate();
        }

        let generation = {
            let mut log = self.log.lock();
            let generation = log.reset();
            log.push_notice(format!("$ {}\n", invocation.command()));
            generation
        };

        let base_environment = self.environment.effective_environment();
        let mut child = match invocation.to_command(base_environment).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = invocation.command(), error = %e, "failed to spawn command");
                self.log
                    .lock()
                    .push_notice(format!("Error running command: {}\n", e));
                return Err(SupervisorError::Spawn(e));
            }
        };

        let (tx, rx) = mpsc::channel();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let mut handle = RunHandle {
            id: Uuid::new_v4(),
            pid: child.id(),
            command: invocation.command().to_string(),
            child: Some(child),
            status: RunStatus::Running,
            lines: rx,
            log: Arc::clone(&self.log),
            readers: Vec::with_capacity(2),
            pending_notice: None,
        };
        info!(
            run_id = %handle.id,
            pid = handle.pid,
            command = %handle.command,
            cwd = %invocation.working_directory().display(),
            "run started"
        );

        // On failure the handle is dropped here, which tears the process down
        if let Some(stdout) = stdout {
            let spawned = reader::spawn_reader(
                StreamKind::Stdout,
                stdout,
                generation,
                Arc::clone(&self.log),
                tx.clone(),
            );
            handle.readers.push(self.reader_started(spawned)?);
        }
        if let Some(stderr) = stderr {
            let spawned = reader::spawn_reader(
                StreamKind::Stderr,
                stderr,
                generation,
                Arc::clone(&self.log),
                tx,
            );
            handle.readers.push(self.reader_started(spawned)?);
        }

        Ok(self.current.insert(handle))
    }

    fn reader_started(
        &self,
        spawned: io::Result<JoinHandle<()>>,
    ) -> Result<JoinHandle<()>, SupervisorError> {
        spawned.map_err(|e| {
            warn!(error = %e, "failed to start output reader");
            self.log
                .lock()
                .push_notice(format!("Error running command: {}\n", e));
            SupervisorError::Spawn(e)
        })
    }

    pub fn handle(&self) -> Option<&RunHandle> {
        self.current.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut RunHandle> {
        self.current.as_mut()
    }

    /// Poll the active run, if any.
    pub fn poll(&mut self) -> Option<RunStatus> {
        self.current.as_mut().map(RunHandle::poll)
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(RunHandle::is_alive)
    }

    /// Tear down the active run's process tree. No-op when idle or finished.
    pub fn terminate(&mut self) {
        if let Some(handle) = self.current.as_mut() {
            handle.terminate();
        }
    }

    /// Acknowledge the current run and go back to idle.
    ///
    /// A run that is still live is terminated first. Returns its final status.
    pub fn release(&mut self) -> Option<RunStatus> {
        let mut handle = self.current.take()?;
        handle.terminate();
        handle.flush_exit_notice(true);
        Some(handle.status())
    }

    /// The log as one string
    pub fn logs(&self) -> String {
        self.log.lock().contents()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.log.lock().lines()
    }

    pub fn has_logs(&self) -> bool {
        !self.log.lock().is_empty()
    }

    /// Add a caller-side message (e.g. a validation error) to the log
    pub fn append_log(&self, text: impl Into<String>) {
        self.log.lock().push_notice(text);
    }

    /// Empty the log. A live process keeps running and keeps logging.
    pub fn clear_logs(&self) {
        self.log.lock().clear();
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
