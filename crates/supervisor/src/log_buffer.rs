use parking_lot::Mutex;
use std::sync::Arc;

pub(crate) type SharedLog = Arc<Mutex<LogBuffer>>;

/// Ordered text collected for the current run.
///
/// Each run gets a new generation; appends tagged with an older generation
/// are dropped so a dying run can't leak into its successor.
#[derive(Debug, Default)]
pub(crate) struct LogBuffer {
    generation: u64,
    lines: Vec<String>,
}

impl LogBuffer {
    pub(crate) fn shared() -> SharedLog {
        Arc::new(Mutex::new(Self::default()))
    }

    /// Start a new generation with an empty buffer.
    pub(crate) fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.lines.clear();
        self.generation
    }

    pub(crate) fn append(&mut self, generation: u64, text: &str) -> bool {
        if generation != self.generation {
            return false;
        }
        self.lines.push(text.to_string());
        true
    }

    /// Append a line for the current generation
    pub(crate) fn push_notice(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }

    pub(crate) fn contents(&self) -> String {
        self.lines.concat()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
