//! Background threads that turn a pipe into output lines.

use crate::log_buffer::SharedLog;
use shared::{OutputLine, StreamKind};
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use tracing::debug;

/// Read `pipe` line by line until EOF.
///
/// Every line is appended to the log and sent to the caller under the log
/// lock, so the buffer order always matches the delivery order. Invalid
/// UTF-8 is replaced rather than ending the stream.
pub(crate) fn spawn_reader<R>(
    stream: StreamKind,
    pipe: R,
    generation: u64,
    log: SharedLog,
    tx: Sender<OutputLine>,
) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name(format!("{}-reader", stream.as_str()))
        .spawn(move || read_lines(stream, pipe, generation, &log, &tx))
}

fn read_lines<R: Read>(
    stream: StreamKind,
    pipe: R,
    generation: u64,
    log: &SharedLog,
    tx: &Sender<OutputLine>,
) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf).into_owned();
                let mut log = log.lock();
                log.append(generation, &text);
                let delivered = tx.send(OutputLine { stream, text }).is_ok();
                drop(log);

                if !delivered {
                    debug!(stream = stream.as_str(), "receiver gone, stopping reader");
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(stream = stream.as_str(), error = %e, "pipe read failed");
                break;
            }
        }
    }
}
