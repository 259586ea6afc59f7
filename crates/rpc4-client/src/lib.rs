//! Blocking serial client for BayTech RPC-4 power distribution units.
//!
//! # Overview
//!
//! - [`Session`] owns the serial transport and frames every response on the
//!   unit's command prompt.
//! - [`Rpc4Client`] sequences commands on a session: status queries and
//!   outlet switching.
//! - [`SessionConfig`] holds the line parameters, loadable from YAML.
//!
//! All calls block for at most the configured timeout. A session carries one
//! command at a time; callers that share a client must serialize access
//! themselves. The usual pattern is one session per logical operation:
//!
//! ```rust,no_run
//! use rpc4_client::{Rpc4Client, SessionConfig};
//!
//! let mut client = Rpc4Client::new(SessionConfig::new("/dev/ttyUSB0"));
//! client.connect()?;
//! let status = client.status()?;
//! println!("breaker: {:?}", status.circuit_breaker);
//! client.turn_off(3)?;
//! client.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod client;
mod config;
mod error;
pub mod metric_defs;
mod session;
mod transport;

pub use client::*;
pub use config::*;
pub use error::*;
pub use metric_defs::describe_metrics;
pub use session::*;
pub use transport::*;

pub use rpc4_protocol::{OutletAction, OutletEntry, OutletId, PromptMatch, StatusSnapshot};
