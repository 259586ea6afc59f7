//! A live connection to one unit.
//!
//! The session owns the transport and the prompt codec. Every exchange is a
//! blocking write followed by a blocking read that ends at the command prompt
//! or at the configured timeout. The link is half-duplex and the protocol has
//! no request ids, so a session never has more than one command outstanding.

use std::io;
use std::time::{Duration, Instant};

use rpc4_protocol::{Command, PromptCodec, PromptMatch};
use tracing::{debug, info_span, trace, warn, Span};

use crate::config::SessionConfig;
use crate::error::{ClientError, ClientResult, ConnectError};
use crate::metric_defs;
use crate::transport::{SerialTransport, Transport};

/// Size of a single read from the transport.
const READ_CHUNK_SIZE: usize = 256;

/// An open, handshaken connection to one unit.
pub struct Session {
    config: SessionConfig,
    transport: Option<Box<dyn Transport>>,
    codec: PromptCodec,
    connected: bool,
    span: Span,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device", &self.config.device)
            .field("connected", &self.connected)
            .field("buffered", &self.codec.buffered_len())
            .finish()
    }
}

impl Session {
    /// Open the configured serial device and perform the handshake.
    pub fn connect(config: SessionConfig) -> Result<Session, ConnectError> {
        check_config(&config)?;
        let span = info_span!("rpc4", device = %config.device);
        let transport = {
            let _guard = span.enter();
            SerialTransport::open(&config).map_err(|source| {
                warn!("Cannot open {}: {}", config.device, source);
                metrics::counter!(metric_defs::CONNECT_FAILURES, "device" => config.device.clone())
                    .increment(1);
                ConnectError::Open {
                    device: config.device.clone(),
                    source,
                }
            })?
        };

        Session::handshake(Box::new(transport), config, span)
    }

    /// Perform the handshake over an already open transport.
    pub fn connect_with<T>(transport: T, config: SessionConfig) -> Result<Session, ConnectError>
    where
        T: Transport + 'static,
    {
        check_config(&config)?;
        let span = info_span!("rpc4", device = %config.device);
        Session::handshake(Box::new(transport), config, span)
    }

    /// Send an empty line and wait for the prompt.
    fn handshake(
        transport: Box<dyn Transport>,
        config: SessionConfig,
        span: Span,
    ) -> Result<Session, ConnectError> {
        // The banner may end in a longer prompt such as `RPC-4>`.
        let codec = PromptCodec::new(config.prompt_bytes(), PromptMatch::Anywhere);
        let mut session = Session {
            config,
            transport: Some(transport),
            codec,
            // Provisional; cleared below unless the prompt shows up.
            connected: true,
            span,
        };

        let span = session.span.clone();
        let _guard = span.enter();
        debug!("Connecting (prompt {:?})", session.config.command_prompt);

        let timeout = session.config.timeout();
        let result = session
            .send(&Command::Wake)
            .and_then(|_| session.read_until_prompt(timeout));

        match result {
            Ok(banner) => {
                trace!("Banner: {:?}", String::from_utf8_lossy(&banner));
                session.codec.set_policy(session.config.prompt_match);
                debug!("Connected");
                Ok(session)
            }
            Err(e) => {
                let device = session.config.device.clone();
                let timeout_ms = session.config.timeout_ms;
                session.close();
                warn!("Handshake failed: {}", e);
                metrics::counter!(metric_defs::CONNECT_FAILURES, "device" => device.clone())
                    .increment(1);
                Err(match e {
                    ClientError::Io(source) => ConnectError::Io { device, source },
                    ClientError::Timeout { .. } | ClientError::NotConnected => {
                        ConnectError::NoPrompt { device, timeout_ms }
                    }
                })
            }
        }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the device path.
    pub fn device(&self) -> &str {
        &self.config.device
    }

    /// Check whether the session is connected.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Get the span all session logging is recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    fn transport_mut(&mut self) -> ClientResult<&mut Box<dyn Transport>> {
        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        self.transport.as_mut().ok_or(ClientError::NotConnected)
    }

    /// Write raw bytes. No terminator is added.
    pub fn write_line(&mut self, bytes: &[u8]) -> ClientResult<()> {
        trace!("TX {:?}", String::from_utf8_lossy(bytes));
        self.transport_mut()?.write_bytes(bytes)?;
        Ok(())
    }

    /// Encode and write a command.
    pub fn send(&mut self, command: &Command) -> ClientResult<()> {
        let span = self.span.clone();
        let _guard = span.enter();

        debug!("Sending {:?}", command);
        self.write_line(&command.encode())?;
        metrics::counter!(
            metric_defs::COMMANDS_SENT,
            "device" => self.config.device.clone(),
            "command" => command_label(command)
        )
        .increment(1);
        Ok(())
    }

    /// Read until the prompt arrives or `timeout` elapses.
    ///
    /// Returns every byte of the frame including the prompt. Bytes that follow
    /// the prompt stay buffered for the next read.
    pub fn read_until_prompt(&mut self, timeout: Duration) -> ClientResult<Vec<u8>> {
        let span = self.span.clone();
        let _guard = span.enter();

        if !self.connected {
            return Err(ClientError::NotConnected);
        }
        let Some(transport) = self.transport.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(frame) = self.codec.decode() {
                trace!("RX frame ({} bytes)", frame.len());
                return Ok(frame);
            }

            let now = Instant::now();
            if now >= deadline {
                let received = self.codec.buffered_len();
                warn!(
                    "Timeout waiting for prompt {:?} ({} bytes buffered: {:?})",
                    self.config.command_prompt,
                    received,
                    self.codec.buffer_as_str()
                );
                metrics::counter!(metric_defs::READ_TIMEOUTS, "device" => self.config.device.clone())
                    .increment(1);
                return Err(ClientError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                    received,
                });
            }

            match transport.read_chunk(&mut buf, deadline - now) {
                Ok(0) => {}
                Ok(n) => {
                    trace!("RX {:?}", String::from_utf8_lossy(&buf[..n]));
                    self.codec.push(&buf[..n]);
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    warn!("Read failed: {}", e);
                    return Err(ClientError::Io(e));
                }
            }
        }
    }

    /// Send a command and read its prompt-terminated response.
    pub fn exchange(&mut self, command: &Command) -> ClientResult<Vec<u8>> {
        self.send(command)?;
        let timeout = self.config.timeout();
        self.read_until_prompt(timeout)
    }

    /// Release the transport. Safe to call any number of times.
    pub fn close(&mut self) {
        let span = self.span.clone();
        let _guard = span.enter();

        if self.connected {
            if let Some(mut transport) = self.transport.take() {
                if let Err(e) = transport.close() {
                    debug!("Error closing transport: {}", e);
                }
            }
            debug!("Closed");
        }
        self.connected = false;
        self.codec.clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn check_config(config: &SessionConfig) -> Result<(), ConnectError> {
    config.validate().map_err(|source| ConnectError::Config {
        device: config.device.clone(),
        source,
    })
}

fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Wake => "wake",
        Command::Status => "status",
        Command::Outlet { action, .. } => match action {
            rpc4_protocol::OutletAction::On => "on",
            rpc4_protocol::OutletAction::Off => "off",
        },
    }
}
