//! Typed operations on top of a session.
//!
//! The client mirrors the operations the unit supports: a status dump and
//! per-outlet switching. It owns at most one [`Session`] and checks that it is
//! connected before touching the transport.

use rpc4_protocol::{Command, OutletAction, OutletEntry, OutletId, StatusSnapshot};
use serde::Serialize;
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::{ClientError, ClientResult, ConnectError};
use crate::session::Session;
use crate::transport::Transport;

/// Result of a status query with an optional outlet filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StatusReply {
    /// No filter: the whole snapshot.
    Snapshot(StatusSnapshot),
    /// Filter in 1..=8: that outlet's entry.
    Outlet(OutletEntry),
    /// Filter outside 1..=8: nothing.
    Empty,
}

impl StatusReply {
    /// Get the snapshot, if this is a full reply.
    pub fn as_snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            StatusReply::Snapshot(s) => Some(s),
            _ => None,
        }
    }

    /// Get the outlet entry, if this is a filtered reply.
    pub fn as_outlet(&self) -> Option<&OutletEntry> {
        match self {
            StatusReply::Outlet(o) => Some(o),
            _ => None,
        }
    }
}

/// Client for one RPC-4 unit.
///
/// Every operation takes `&mut self`; share a client across threads only
/// behind a lock.
#[derive(Debug)]
pub struct Rpc4Client {
    config: SessionConfig,
    session: Option<Session>,
}

impl Rpc4Client {
    /// Create a disconnected client.
    pub fn new(config: SessionConfig) -> Self {
        Rpc4Client {
            config,
            session: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open the serial device and wait for the prompt.
    ///
    /// An existing session is closed first.
    pub fn connect(&mut self) -> Result<(), ConnectError> {
        self.close();
        self.session = Some(Session::connect(self.config.clone())?);
        Ok(())
    }

    /// Perform the handshake over a caller-supplied transport.
    pub fn connect_with<T>(&mut self, transport: T) -> Result<(), ConnectError>
    where
        T: Transport + 'static,
    {
        self.close();
        self.session = Some(Session::connect_with(transport, self.config.clone())?);
        Ok(())
    }

    /// Check whether a session is open.
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_connected)
    }

    /// Close the session, if any. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
    }

    fn session_mut(&mut self) -> ClientResult<&mut Session> {
        match self.session.as_mut() {
            Some(session) if session.is_connected() => Ok(session),
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Query and parse the full status report.
    pub fn status(&mut self) -> ClientResult<StatusSnapshot> {
        let session = self.session_mut()?;
        let raw = session.exchange(&Command::Status)?;
        Ok(StatusSnapshot::parse(&raw))
    }

    /// Query the status report, optionally narrowed to one outlet.
    ///
    /// Outlet numbers outside 1..=8, negative ones included, yield
    /// [`StatusReply::Empty`] rather than an error.
    pub fn get_status(&mut self, outlet: Option<i64>) -> ClientResult<StatusReply> {
        let snapshot = self.status()?;

        Ok(match outlet {
            None => StatusReply::Snapshot(snapshot),
            Some(n) => match OutletId::try_from(n) {
                Ok(id) => StatusReply::Outlet(snapshot.outlet(id).clone()),
                Err(_) => {
                    debug!("Outlet {} out of range, returning empty status", n);
                    StatusReply::Empty
                }
            },
        })
    }

    /// Switch one outlet.
    ///
    /// Outlet numbers outside 1..=8 are ignored: nothing is sent and `Ok` is
    /// returned. The unit's reply is read and discarded to keep the stream
    /// framed.
    pub fn set_outlet(&mut self, outlet: i64, action: OutletAction) -> ClientResult<()> {
        let session = self.session_mut()?;

        let Ok(id) = OutletId::try_from(outlet) else {
            debug!("Ignoring {} for out-of-range outlet {}", action, outlet);
            return Ok(());
        };

        session.exchange(&Command::Outlet { id, action })?;
        Ok(())
    }

    /// Switch every outlet, 1 through 8, one command at a time.
    ///
    /// Stops at the first failure; outlets already switched stay switched.
    pub fn set_all(&mut self, action: OutletAction) -> ClientResult<()> {
        self.session_mut()?;
        for id in OutletId::all() {
            self.set_outlet(i64::from(id.get()), action)?;
        }
        Ok(())
    }

    /// Turn one outlet on.
    pub fn turn_on(&mut self, outlet: i64) -> ClientResult<()> {
        self.set_outlet(outlet, OutletAction::On)
    }

    /// Turn one outlet off.
    pub fn turn_off(&mut self, outlet: i64) -> ClientResult<()> {
        self.set_outlet(outlet, OutletAction::Off)
    }

    /// Turn every outlet on.
    pub fn turn_on_all(&mut self) -> ClientResult<()> {
        self.set_all(OutletAction::On)
    }

    /// Turn every outlet off.
    pub fn turn_off_all(&mut self) -> ClientResult<()> {
        self.set_all(OutletAction::Off)
    }
}

impl Drop for Rpc4Client {
    fn drop(&mut self) {
        self.close();
    }
}
