//! Line console over standard input and output.
//!
//! A background thread reads stdin line by line and feeds a channel, so the
//! poll loop can check for input without blocking and enrollment can wait
//! with a deadline. On ESP-IDF, stdin and stdout are the serial console.

use std::io::{self, BufRead, ErrorKind, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::config::MAX_LINE_CHARS;
use crate::traits::OperatorConsole;

/// Wait between polls of a non-blocking stdin (the ESP-IDF UART console).
const IDLE_WAIT: Duration = Duration::from_millis(20);

/// Operator console on stdin/stdout.
pub struct StdioConsole {
    lines: Receiver<String>,
    closed: bool,
}

impl StdioConsole {
    /// Start the reader thread.
    pub fn spawn() -> io::Result<Self> {
        let (tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || pump_stdin(tx))?;
        Ok(Self {
            lines,
            closed: false,
        })
    }

    /// Next complete line, if one is already waiting.
    pub fn try_line(&mut self) -> Option<String> {
        match self.lines.try_recv() {
            Ok(line) => Some(clean_line(&line)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.mark_closed();
                None
            }
        }
    }

    /// True once stdin has reached end of input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            tracing::debug!("stdin closed");
            self.closed = true;
        }
    }
}

impl OperatorConsole for StdioConsole {
    fn write_line(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    fn read_line(&mut self, timeout_ms: u64) -> Option<String> {
        match self.lines.recv_timeout(Duration::from_millis(timeout_ms)) {
            Ok(line) => Some(clean_line(&line)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.mark_closed();
                None
            }
        }
    }
}

fn pump_stdin(tx: Sender<String>) {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();
    loop {
        match input.read_line(&mut line) {
            // ESP-IDF reports "nothing yet" as end of input
            Ok(0) if cfg!(target_os = "espidf") => thread::sleep(IDLE_WAIT),
            Ok(0) => break,
            // Partial line, keep reading
            Ok(_) if !line.ends_with('\n') => {}
            Ok(_) => {
                if tx.send(std::mem::take(&mut line)).is_err() {
                    return;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                thread::sleep(IDLE_WAIT)
            }
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
    if !line.is_empty() {
        let _ = tx.send(line);
    }
}

/// Trim a raw console line (including any `\r`) and cap its length.
pub fn clean_line(raw: &str) -> String {
    raw.trim().chars().take(MAX_LINE_CHARS).collect()
}
