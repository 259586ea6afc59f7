//! Byte transports a session can run over.

use std::io::{self, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, warn};

use crate::config::SessionConfig;

/// A half-duplex byte channel to one unit.
pub trait Transport: Send {
    /// Write all bytes.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever arrives within `timeout`.
    ///
    /// Returns `Ok(0)` or an error of kind `TimedOut`/`WouldBlock` when
    /// nothing arrived.
    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Release the channel.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_bytes(data)
    }

    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read_chunk(buf, timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// A transport over a local serial port.
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open the configured serial device.
    pub fn open(config: &SessionConfig) -> Result<Self, serialport::Error> {
        let flow = config.flow_control.serial_flow_control();
        if config.flow_control.xonxoff && config.flow_control.rtscts {
            warn!("Both XON/XOFF and RTS/CTS requested; using RTS/CTS");
        }

        let mut port = serialport::new(&config.device, config.baud_rate)
            .timeout(config.timeout())
            .flow_control(flow)
            .open()?;

        if config.flow_control.dsrdtr {
            port.write_data_terminal_ready(true)?;
        }

        debug!(
            "Opened {} at {} baud (flow control {:?})",
            config.device, config.baud_rate, flow
        );

        Ok(SerialTransport {
            name: config.device.clone(),
            port: Some(port),
        })
    }

    /// Get the device path.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn port_mut(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial port closed"))
    }
}

impl Transport for SerialTransport {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()
    }

    fn read_chunk(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let port = self.port_mut()?;
        port.set_timeout(timeout)?;
        port.read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(mut port) = self.port.take() {
            port.flush()?;
        }
        Ok(())
    }
}
