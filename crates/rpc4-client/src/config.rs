//! Session configuration.
//!
//! Every parameter is fixed when a session is opened. Configs can be built in
//! code or loaded from YAML:
//!
//! ```yaml
//! device: /dev/ttyUSB0
//! baud_rate: 9600
//! timeout_ms: 5000
//! flow_control:
//!   rtscts: true
//! command_prompt: "RPC-4>"
//! prompt_match: line_start
//! ```

use std::path::Path;
use std::time::Duration;

use rpc4_protocol::{PromptMatch, DEFAULT_PROMPT};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default serial device.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default bound on every prompt-terminated read, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

/// Independent flow-control switches for the serial line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowControlFlags {
    /// Software (XON/XOFF) flow control.
    pub xonxoff: bool,
    /// Hardware RTS/CTS flow control.
    pub rtscts: bool,
    /// Hardware DSR/DTR handshaking.
    pub dsrdtr: bool,
}

impl FlowControlFlags {
    /// Map onto the flow control modes the serial driver supports.
    ///
    /// RTS/CTS wins over XON/XOFF when both are set. DSR/DTR has no driver
    /// mode; the session asserts DTR instead.
    pub fn serial_flow_control(&self) -> serialport::FlowControl {
        if self.rtscts {
            serialport::FlowControl::Hardware
        } else if self.xonxoff {
            serialport::FlowControl::Software
        } else {
            serialport::FlowControl::None
        }
    }
}

/// Configuration for one session with one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub device: String,
    /// Line speed.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Bound on the handshake and on every prompt-terminated read.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Flow control switches.
    #[serde(default)]
    pub flow_control: FlowControlFlags,
    /// Prompt the unit prints when ready for the next command.
    #[serde(default = "default_prompt")]
    pub command_prompt: String,
    /// Where the prompt must appear to end a response.
    #[serde(default)]
    pub prompt_match: PromptMatch,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::new(DEFAULT_DEVICE)
    }
}

impl SessionConfig {
    /// Create a config for a device with default line parameters.
    pub fn new(device: impl Into<String>) -> Self {
        SessionConfig {
            device: device.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            flow_control: FlowControlFlags::default(),
            command_prompt: default_prompt(),
            prompt_match: PromptMatch::default(),
        }
    }

    /// Set the line speed.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout in milliseconds.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the flow control switches.
    pub fn with_flow_control(mut self, flow_control: FlowControlFlags) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Set the command prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.command_prompt = prompt.into();
        self
    }

    /// Set the prompt match policy.
    pub fn with_prompt_match(mut self, prompt_match: PromptMatch) -> Self {
        self.prompt_match = prompt_match;
        self
    }

    /// Get the read timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get the prompt as bytes.
    pub fn prompt_bytes(&self) -> &[u8] {
        self.command_prompt.as_bytes()
    }

    /// Check that a session can be opened with this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_prompt.is_empty() {
            return Err(ConfigError::EmptyPrompt);
        }
        Ok(())
    }

    /// Parse a config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.device, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_millis(5000));
        assert_eq!(config.flow_control, FlowControlFlags::default());
        assert_eq!(config.command_prompt, ">");
        assert_eq!(config.prompt_match, PromptMatch::Anywhere);
    }

    #[test]
    fn test_yaml_fills_defaults() {
        let config = SessionConfig::from_yaml_str("device: /dev/ttyS1\n").unwrap();
        assert_eq!(config, SessionConfig::new("/dev/ttyS1"));
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = "device: COM3\nbaud_rate: 19200\ntimeout_ms: 250\n\
                    flow_control:\n  xonxoff: true\n  dsrdtr: true\n\
                    command_prompt: \"RPC-4>\"\nprompt_match: line_start\n";
        let config = SessionConfig::from_yaml_str(yaml).unwrap();

        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.timeout_ms, 250);
        assert!(config.flow_control.xonxoff);
        assert!(!config.flow_control.rtscts);
        assert!(config.flow_control.dsrdtr);
        assert_eq!(config.command_prompt, "RPC-4>");
        assert_eq!(config.prompt_match, PromptMatch::LineStart);
    }

    #[test]
    fn test_yaml_requires_device() {
        assert!(matches!(
            SessionConfig::from_yaml_str("baud_rate: 9600\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let yaml = "device: /dev/ttyS1\ncommand_prompt: \"\"\n";
        let err = SessionConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPrompt));

        assert!(matches!(
            SessionConfig::new("/dev/ttyS1").with_prompt("").validate(),
            Err(ConfigError::EmptyPrompt)
        ));
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "device: /dev/ttyUSB3").unwrap();

        let config = SessionConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.device, "/dev/ttyUSB3");
    }

    #[test]
    fn test_missing_file() {
        let err = SessionConfig::from_yaml_file("/nonexistent/rpc4.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/rpc4.yaml"));
    }

    #[test]
    fn test_serial_flow_control_mapping() {
        let none = FlowControlFlags::default();
        assert_eq!(none.serial_flow_control(), serialport::FlowControl::None);

        let soft = FlowControlFlags { xonxoff: true, ..Default::default() };
        assert_eq!(soft.serial_flow_control(), serialport::FlowControl::Software);

        let both = FlowControlFlags { xonxoff: true, rtscts: true, dsrdtr: false };
        assert_eq!(both.serial_flow_control(), serialport::FlowControl::Hardware);
    }
}
