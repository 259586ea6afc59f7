//! BayTech RPC-4 Serial CLI Protocol
//!
//! This crate provides types and utilities for talking to a BayTech RPC-4
//! power distribution unit over its RS-232 command line interface. The
//! interface is meant for a human at a terminal, so there is no binary framing
//! and no structured output.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → unit): short text lines such as `On 3` terminated
//!   with `\r\n`; a bare `\r` re-prints the status report
//! - **Responses** (unit → host): arbitrary text terminated by the command
//!   prompt (default `>`)
//! - **Framing**: the prompt is the only delimiter, see [`PromptCodec`]
//!
//! # Example
//!
//! ```rust
//! use rpc4_protocol::{Command, OutletId, PromptCodec, StatusSnapshot};
//!
//! let cmd = Command::on(OutletId::new(3).unwrap());
//! assert_eq!(cmd.encode(), b"On 3\r\n");
//!
//! let mut codec = PromptCodec::default();
//! codec.push(b"Circuit Breaker: On\r\n1)...port01 : Off\r\n>");
//! let frame = codec.decode().unwrap();
//!
//! let status = StatusSnapshot::parse(&frame);
//! assert_eq!(status.circuit_breaker.as_deref(), Some("On"));
//! ```

mod codec;
mod commands;
mod error;
mod status;

pub use codec::*;
pub use commands::*;
pub use error::*;
pub use status::*;
