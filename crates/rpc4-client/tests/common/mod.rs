//! Scripted in-memory transport for driving a session without hardware.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rpc4_client::Transport;

/// What the fake unit does in response to one write.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Queue these bytes for reading.
    Bytes(Vec<u8>),
    /// Say nothing.
    Silence,
    /// Fail the write as if the cable was pulled.
    WriteError,
}

impl Reply {
    pub fn text(s: &str) -> Reply {
        Reply::Bytes(s.as_bytes().to_vec())
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    written: Vec<Vec<u8>>,
    replies: VecDeque<Reply>,
    pending: VecDeque<u8>,
    closed: bool,
    max_chunk: Option<usize>,
}

/// Shared view of the fake unit, kept by the test after the transport moves
/// into a session.
#[derive(Debug, Clone, Default)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn new() -> Self {
        Script::default()
    }

    /// Queue the reply to the next unanswered write.
    pub fn reply(self, reply: Reply) -> Self {
        self.state.lock().unwrap().replies.push_back(reply);
        self
    }

    /// Queue a text reply.
    pub fn reply_text(self, text: &str) -> Self {
        self.reply(Reply::text(text))
    }

    /// Deliver at most `n` bytes per read.
    pub fn max_chunk(self, n: usize) -> Self {
        self.state.lock().unwrap().max_chunk = Some(n);
        self
    }

    /// Bytes available before anything is written.
    pub fn preload(self, bytes: &[u8]) -> Self {
        self.state.lock().unwrap().pending.extend(bytes.iter().copied());
        self
    }

    pub fn transport(&self) -> ScriptedTransport {
        ScriptedTransport {
            state: self.state.clone(),
        }
    }

    /// Every successful write, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }

    /// Successful writes as lossy strings.
    pub fn written_text(&self) -> Vec<String> {
        self.written()
            .iter()
            .map(|w| String::from_utf8_lossy(w).to_string())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl Transport for ScriptedTransport {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }

        match state.replies.pop_front() {
            Some(Reply::WriteError) => {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unit unplugged"));
            }
            Some(Reply::Bytes(bytes)) => state.pending.extend(bytes),
            Some(Reply::Silence) | None => {}
        }
        state.written.push(data.to_vec());
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.pending.is_empty() {
            drop(state);
            std::thread::sleep(timeout.min(Duration::from_millis(1)));
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }

        let limit = state.max_chunk.unwrap_or(buf.len()).min(buf.len());
        let n = limit.min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Status report in the unit's format, followed by the prompt.
pub const STATUS_REPORT: &str = "\r\nUnit ID: lab-rack\r\n\r\n\
    True RMS Current:   0.9 Amps\r\n\
    Maximum Detected:   2.8 Amps\r\n\r\n\
    Internal Temperature:  33.5 C\r\n\r\n\
    Circuit Breaker: On \r\n\r\n\
    1)...port01    : On \r\n\
    2)...port02    : On \r\n\
    3)...          : Off\r\n\
    4)...port04    : On \r\n\
    5)...port05    : On \r\n\
    6)...port06    : Off\r\n\
    7)...port07    : On \r\n\
    8)...port08    : On \r\n\r\n\
    Type \"Help\" for a list of commands\r\n\r\n>";

/// Banner printed in response to the wake-up line.
pub const BANNER: &str = "\r\nRPC-4 Telnet Host\r\nRevision F 5.01\r\n\r\n>";

/// Echo/confirmation for an outlet command.
pub fn outlet_ack(command: &str) -> String {
    format!("{}\r\n\r\n>", command)
}
