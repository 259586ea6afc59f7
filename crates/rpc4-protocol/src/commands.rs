//! Commands that can be sent to the RPC-4 serial CLI.
//!
//! The unit understands a very small command set:
//! - An empty line (`\r\n`) to wake the CLI and elicit a fresh prompt
//! - A bare carriage return (`\r`) to re-print the status report
//! - `On <n>` / `Off <n>` to switch a single outlet

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Number of switchable outlets on the unit.
pub const OUTLET_COUNT: u8 = 8;

/// Line terminator used for commands.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// A validated outlet number in `1..=OUTLET_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OutletId(u8);

impl OutletId {
    /// Create an outlet id, returning `None` when out of range.
    pub const fn new(id: u8) -> Option<OutletId> {
        if id >= 1 && id <= OUTLET_COUNT {
            Some(OutletId(id))
        } else {
            None
        }
    }

    /// Get the raw outlet number.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Iterate over every outlet in increasing order.
    pub fn all() -> impl Iterator<Item = OutletId> {
        (1..=OUTLET_COUNT).map(OutletId)
    }

    /// Label the unit shows for an outlet without a custom name.
    pub fn default_label(self) -> String {
        format!("Outlet {}", self.0)
    }
}

impl TryFrom<u8> for OutletId {
    type Error = ProtocolError;

    fn try_from(id: u8) -> ProtocolResult<OutletId> {
        OutletId::new(id).ok_or(ProtocolError::InvalidOutlet(id as i64))
    }
}

impl TryFrom<i64> for OutletId {
    type Error = ProtocolError;

    fn try_from(id: i64) -> ProtocolResult<OutletId> {
        u8::try_from(id)
            .ok()
            .and_then(OutletId::new)
            .ok_or(ProtocolError::InvalidOutlet(id))
    }
}

impl From<OutletId> for u8 {
    fn from(id: OutletId) -> u8 {
        id.0
    }
}

impl fmt::Display for OutletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Switching action for an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutletAction {
    /// Energize the outlet.
    On,
    /// De-energize the outlet.
    Off,
}

impl OutletAction {
    /// Keyword used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutletAction::On => "On",
            OutletAction::Off => "Off",
        }
    }
}

impl FromStr for OutletAction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<OutletAction> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(OutletAction::On),
            "off" => Ok(OutletAction::Off),
            _ => Err(ProtocolError::InvalidAction(s.to_string())),
        }
    }
}

impl fmt::Display for OutletAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands that can be sent to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Empty line; flushes partial input and makes the unit print its prompt.
    Wake,

    /// Bare carriage return; the unit answers with its status report.
    Status,

    /// Switch a single outlet.
    Outlet {
        /// Outlet to switch.
        id: OutletId,
        /// Desired state.
        action: OutletAction,
    },
}

impl Command {
    /// Build an outlet "On" command.
    pub fn on(id: OutletId) -> Command {
        Command::Outlet { id, action: OutletAction::On }
    }

    /// Build an outlet "Off" command.
    pub fn off(id: OutletId) -> Command {
        Command::Outlet { id, action: OutletAction::Off }
    }

    /// Get the command text without its terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::Wake | Command::Status => String::new(),
            Command::Outlet { id, action } => format!("{} {}", action, id),
        }
    }

    /// Encode the command for transmission, terminator included.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Wake => LINE_TERMINATOR.to_vec(),
            Command::Status => vec![b'\r'],
            Command::Outlet { .. } => {
                let text = self.to_command_string();
                let mut buf = Vec::with_capacity(text.len() + LINE_TERMINATOR.len());
                buf.extend_from_slice(text.as_bytes());
                buf.extend_from_slice(LINE_TERMINATOR);
                buf
            }
        }
    }
}
