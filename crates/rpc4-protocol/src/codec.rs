//! Prompt-delimited framing for the RPC-4 CLI.
//!
//! The unit has no length prefix or explicit message terminator. Every
//! response ends when the unit prints its interactive command prompt, so the
//! prompt byte sequence is the only frame delimiter.

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

/// Default command prompt printed by the unit.
pub const DEFAULT_PROMPT: &str = ">";

/// Initial buffer capacity; a full status report is a few hundred bytes.
const INITIAL_CAPACITY: usize = 1024;

/// Where a prompt occurrence has to sit to terminate a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMatch {
    /// Any occurrence of the prompt terminates the frame.
    #[default]
    Anywhere,
    /// Only a prompt at the start of the buffer or right after `\r`/`\n`
    /// terminates the frame. Sessions still accept the prompt anywhere in
    /// the connect banner.
    LineStart,
}

/// A codec that splits received bytes into prompt-terminated frames.
///
/// Bytes that arrive after a prompt are kept for the next frame.
#[derive(Debug)]
pub struct PromptCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
    /// Prompt byte sequence.
    prompt: Vec<u8>,
    /// Match policy for the prompt.
    policy: PromptMatch,
}

impl Default for PromptCodec {
    fn default() -> Self {
        PromptCodec::new(DEFAULT_PROMPT.as_bytes(), PromptMatch::Anywhere)
    }
}

impl PromptCodec {
    /// Create a codec for the given prompt.
    pub fn new(prompt: &[u8], policy: PromptMatch) -> Self {
        PromptCodec {
            buffer: BytesMut::with_capacity(INITIAL_CAPACITY),
            prompt: prompt.to_vec(),
            policy,
        }
    }

    /// Get the prompt byte sequence.
    pub fn prompt(&self) -> &[u8] {
        &self.prompt
    }

    /// Get the match policy.
    pub fn policy(&self) -> PromptMatch {
        self.policy
    }

    /// Change the match policy. Buffered bytes are kept.
    pub fn set_policy(&mut self, policy: PromptMatch) {
        self.policy = policy;
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Find the end offset (exclusive) of the first prompt that terminates a frame.
    fn find_prompt_end(&self) -> Option<usize> {
        let len = self.prompt.len();
        if len == 0 || self.buffer.len() < len {
            return None;
        }

        self.buffer
            .windows(len)
            .enumerate()
            .find(|(i, window)| *window == self.prompt.as_slice() && self.accepts_at(*i))
            .map(|(i, _)| i + len)
    }

    fn accepts_at(&self, start: usize) -> bool {
        match self.policy {
            PromptMatch::Anywhere => true,
            PromptMatch::LineStart => {
                start == 0 || matches!(self.buffer[start - 1], b'\r' | b'\n')
            }
        }
    }

    /// Check whether a complete frame is buffered.
    pub fn has_frame(&self) -> bool {
        self.find_prompt_end().is_some()
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns everything up to and including the first accepted prompt, or
    /// `None` if more data is needed.
    pub fn decode(&mut self) -> Option<Vec<u8>> {
        let end = self.find_prompt_end()?;
        Some(self.buffer.split_to(end).to_vec())
    }

    /// Drain everything buffered, prompt or not.
    pub fn take_all(&mut self) -> Vec<u8> {
        self.buffer.split().to_vec()
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer contents as a string (for debugging).
    pub fn buffer_as_str(&self) -> String {
        String::from_utf8_lossy(&self.buffer).to_string()
    }
}
