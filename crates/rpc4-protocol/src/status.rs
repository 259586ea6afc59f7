//! Status report parsing.
//!
//! The status report is free-form text meant for humans, for example:
//!
//! ```text
//! Unit ID: my-power
//!
//! True RMS Current:   0.9 Amps
//! Maximum Detected:   2.8 Amps
//!
//! Internal Temperature:  33.5 C
//!
//! Circuit Breaker: On
//!
//! 1)...port01    : On
//! 2)...port02    : Off
//! ...
//! Type "Help" for a list of commands
//! ```
//!
//! There is no stable grammar, so every field is extracted on its own by a
//! label-anchored pattern. A line that is missing or garbled only affects its
//! own field.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::commands::OutletId;

/// Scalar fields reported in the status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    /// `Average Power`, e.g. "120 Watts".
    AveragePower,
    /// `True RMS Voltage`, e.g. "118 Volts".
    TrueRmsVoltage,
    /// `True RMS Current` in amps, unit stripped.
    TrueRmsCurrent,
    /// `Maximum Detected` current in amps, unit stripped.
    MaximumDetected,
    /// `Circuit Breaker` state token.
    CircuitBreaker,
    /// `Internal Temperature`, e.g. "33.5 C".
    InternalTemperature,
}

impl StatusField {
    /// Every scalar field, in report order.
    pub const ALL: [StatusField; 6] = [
        StatusField::AveragePower,
        StatusField::TrueRmsVoltage,
        StatusField::TrueRmsCurrent,
        StatusField::MaximumDetected,
        StatusField::CircuitBreaker,
        StatusField::InternalTemperature,
    ];

    /// Label printed by the unit.
    pub fn label(&self) -> &'static str {
        match self {
            StatusField::AveragePower => "Average Power",
            StatusField::TrueRmsVoltage => "True RMS Voltage",
            StatusField::TrueRmsCurrent => "True RMS Current",
            StatusField::MaximumDetected => "Maximum Detected",
            StatusField::CircuitBreaker => "Circuit Breaker",
            StatusField::InternalTemperature => "Internal Temperature",
        }
    }
}

impl fmt::Display for StatusField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name and state of one outlet.
///
/// Both parts are `None` when the report had no line for the outlet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutletEntry {
    /// Custom name, or "Outlet <n>" when the unit prints none.
    pub label: Option<String>,
    /// Raw state token, usually "On" or "Off".
    pub state: Option<String>,
}

impl OutletEntry {
    /// Create an entry with a label and state.
    pub fn new(label: impl Into<String>, state: impl Into<String>) -> Self {
        OutletEntry {
            label: Some(label.into()),
            state: Some(state.into()),
        }
    }

    /// Check whether the report said nothing about this outlet.
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.state.is_none()
    }

    /// Check whether the reported state is "On".
    pub fn is_on(&self) -> bool {
        self.state
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("on"))
    }
}

/// Parsed result of one status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Average power including unit, e.g. "120 Watts".
    pub average_power: Option<String>,
    /// True RMS voltage including unit, e.g. "118 Volts".
    pub true_rms_voltage: Option<String>,
    /// True RMS current in amps, unit stripped, e.g. "0.9".
    pub true_rms_current: Option<String>,
    /// Maximum detected current in amps, unit stripped, e.g. "2.8".
    pub maximum_detected: Option<String>,
    /// Circuit breaker state token, e.g. "On".
    pub circuit_breaker: Option<String>,
    /// Internal temperature including unit, e.g. "33.5 C".
    pub internal_temperature: Option<String>,
    /// One entry for every outlet id 1..=8.
    pub outlets: BTreeMap<u8, OutletEntry>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        StatusSnapshot {
            average_power: None,
            true_rms_voltage: None,
            true_rms_current: None,
            maximum_detected: None,
            circuit_breaker: None,
            internal_temperature: None,
            outlets: OutletId::all()
                .map(|id| (id.get(), OutletEntry::default()))
                .collect(),
        }
    }
}

impl StatusSnapshot {
    /// Parse a raw status response.
    pub fn parse(raw: &[u8]) -> StatusSnapshot {
        StatusParser::shared().parse(raw)
    }

    /// Get a scalar field by kind.
    pub fn field(&self, field: StatusField) -> Option<&str> {
        match field {
            StatusField::AveragePower => self.average_power.as_deref(),
            StatusField::TrueRmsVoltage => self.true_rms_voltage.as_deref(),
            StatusField::TrueRmsCurrent => self.true_rms_current.as_deref(),
            StatusField::MaximumDetected => self.maximum_detected.as_deref(),
            StatusField::CircuitBreaker => self.circuit_breaker.as_deref(),
            StatusField::InternalTemperature => self.internal_temperature.as_deref(),
        }
    }

    fn field_mut(&mut self, field: StatusField) -> &mut Option<String> {
        match field {
            StatusField::AveragePower => &mut self.average_power,
            StatusField::TrueRmsVoltage => &mut self.true_rms_voltage,
            StatusField::TrueRmsCurrent => &mut self.true_rms_current,
            StatusField::MaximumDetected => &mut self.maximum_detected,
            StatusField::CircuitBreaker => &mut self.circuit_breaker,
            StatusField::InternalTemperature => &mut self.internal_temperature,
        }
    }

    /// Get the entry for an outlet.
    pub fn outlet(&self, id: OutletId) -> &OutletEntry {
        // Every id is inserted by Default; the fallback is unreachable.
        static EMPTY: OutletEntry = OutletEntry { label: None, state: None };
        self.outlets.get(&id.get()).unwrap_or(&EMPTY)
    }

    /// Check whether nothing at all was recognized.
    pub fn is_empty(&self) -> bool {
        StatusField::ALL.iter().all(|f| self.field(*f).is_none())
            && self.outlets.values().all(OutletEntry::is_empty)
    }
}

/// Post-processing applied to a captured value.
type PostProcess = fn(&str) -> String;

fn keep(value: &str) -> String {
    value.trim().to_string()
}

fn strip_amps(value: &str) -> String {
    value.trim().trim_end_matches("Amps").trim_end().to_string()
}

/// Field extraction table: field, pattern with one capture group, post-processing.
const FIELD_PATTERNS: [(StatusField, &str, PostProcess); 6] = [
    (StatusField::AveragePower, r"Average Power:[ \t]*(\d+[ \t]*Watts)", keep),
    (StatusField::TrueRmsVoltage, r"True RMS Voltage:[ \t]*(\d+(?:\.\d+)?[ \t]*Volts)", keep),
    (StatusField::TrueRmsCurrent, r"True RMS Current:[ \t]*(\d+(?:\.\d+)?[ \t]*Amps)", strip_amps),
    (StatusField::MaximumDetected, r"Maximum Detected:[ \t]*(\d+(?:\.\d+)?[ \t]*Amps)", strip_amps),
    (StatusField::CircuitBreaker, r"Circuit Breaker:[ \t]*(\w+)", keep),
    (StatusField::InternalTemperature, r"Internal Temperature:[ \t]*(-?\d+(?:\.\d+)?[ \t]*C)\b", keep),
];

/// Pattern for one outlet line: `<id>)`, optional dots, label up to a colon, state token.
///
/// A line starts after `\n` or `\r`, so `\r\n`, `\n\r` and bare `\r` line
/// endings all work.
fn outlet_pattern(id: OutletId) -> String {
    format!(r"(?m)(?:^|\r)[ \t]*{}\)\.*[ \t]*([^:\r\n]*?)[ \t]*:[ \t]*(\w*)", id)
}

/// Compiled status extraction rules.
#[derive(Debug)]
pub struct StatusParser {
    fields: Vec<(StatusField, Regex, PostProcess)>,
    outlets: Vec<(OutletId, Regex)>,
}

impl StatusParser {
    /// Compile the extraction rules.
    pub fn new() -> Result<Self, regex::Error> {
        let fields = FIELD_PATTERNS
            .iter()
            .map(|(field, pattern, post)| -> Result<_, regex::Error> {
                Ok((*field, Regex::new(pattern)?, *post))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let outlets = OutletId::all()
            .map(|id| -> Result<_, regex::Error> { Ok((id, Regex::new(&outlet_pattern(id))?)) })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StatusParser { fields, outlets })
    }

    /// Get the process-wide parser.
    pub fn shared() -> &'static StatusParser {
        static PARSER: OnceLock<StatusParser> = OnceLock::new();
        PARSER.get_or_init(|| StatusParser::new().expect("built-in status patterns are valid"))
    }

    /// Parse raw response bytes. Never fails; unrecognized parts stay empty.
    pub fn parse(&self, raw: &[u8]) -> StatusSnapshot {
        let text = String::from_utf8_lossy(raw);
        self.parse_str(&text)
    }

    /// Parse already-decoded response text.
    pub fn parse_str(&self, text: &str) -> StatusSnapshot {
        trace!("Raw status:\n{}", text);

        let mut snapshot = StatusSnapshot::default();

        for (field, regex, post) in &self.fields {
            match regex.captures(text).and_then(|c| c.get(1)) {
                Some(m) => {
                    let value = post(m.as_str());
                    trace!("{}: {:?}", field, value);
                    *snapshot.field_mut(*field) = Some(value);
                }
                None => debug!("No match for {}", field),
            }
        }

        for (id, regex) in &self.outlets {
            let Some(caps) = regex.captures(text) else {
                debug!("No match for outlet {}", id);
                continue;
            };

            let label = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let state = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

            let entry = OutletEntry {
                label: Some(if label.is_empty() {
                    id.default_label()
                } else {
                    label.to_string()
                }),
                state: (!state.is_empty()).then(|| state.to_string()),
            };
            trace!("Outlet {}: {:?}", id, entry);
            snapshot.outlets.insert(id.get(), entry);
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\r\nUnit ID: my-power\r\n\r\n\
        Average Power:  120 Watts\r\n\
        True RMS Voltage:  118.4 Volts\r\n\
        True RMS Current:   0.9 Amps\r\n\
        Maximum Detected:   2.8 Amps\r\n\r\n\
        Internal Temperature:  33.5 C\r\n\r\n\
        Circuit Breaker: On \r\n\r\n\
        1)...port01    : On \r\n\
        2)...port02    : Off\r\n\
        3)...Web Server: On \r\n\
        4)...          : On \r\n\
        5)...port05    : On \r\n\
        6)...port06    : Off\r\n\
        7)...port07    : On \r\n\
        8)...port08    : On \r\n\r\n\
        Type \"Help\" for a list of commands\r\n\r\nRPC-4>";

    fn id(n: u8) -> OutletId {
        OutletId::new(n).unwrap()
    }

    #[test]
    fn test_parse_full_report() {
        let status = StatusSnapshot::parse(SAMPLE.as_bytes());

        assert_eq!(status.average_power.as_deref(), Some("120 Watts"));
        assert_eq!(status.true_rms_voltage.as_deref(), Some("118.4 Volts"));
        assert_eq!(status.true_rms_current.as_deref(), Some("0.9"));
        assert_eq!(status.maximum_detected.as_deref(), Some("2.8"));
        assert_eq!(status.internal_temperature.as_deref(), Some("33.5 C"));
        assert_eq!(status.circuit_breaker.as_deref(), Some("On"));

        assert_eq!(status.outlet(id(1)), &OutletEntry::new("port01", "On"));
        assert_eq!(status.outlet(id(2)), &OutletEntry::new("port02", "Off"));
        assert_eq!(status.outlet(id(3)), &OutletEntry::new("Web Server", "On"));
        assert_eq!(status.outlet(id(8)), &OutletEntry::new("port08", "On"));
        assert_eq!(status.outlets.len(), 8);
    }

    #[test]
    fn test_empty_label_gets_default_name() {
        let status = StatusSnapshot::parse(SAMPLE.as_bytes());
        assert_eq!(status.outlet(id(4)), &OutletEntry::new("Outlet 4", "On"));
    }

    #[test]
    fn test_missing_outlets_are_empty_entries() {
        let raw = "Average Power: 120 Watts\n1)...port01 : On\n2)...port02 : Off\n";
        let status = StatusSnapshot::parse(raw.as_bytes());

        assert_eq!(status.average_power.as_deref(), Some("120 Watts"));
        assert_eq!(status.outlet(id(1)), &OutletEntry::new("port01", "On"));
        assert_eq!(status.outlet(id(2)), &OutletEntry::new("port02", "Off"));
        for n in 3..=8 {
            assert!(status.outlets.contains_key(&n), "outlet {} key missing", n);
            assert!(status.outlet(id(n)).is_empty());
        }
    }

    #[test]
    fn test_garbage_yields_empty_snapshot() {
        let status = StatusSnapshot::parse(b"\x00\xffnoise without fields");
        assert!(status.is_empty());
        assert_eq!(status.outlets.len(), 8);
        assert_eq!(status, StatusSnapshot::default());
    }

    #[test]
    fn test_fields_are_independent() {
        let raw = "True RMS Current: lots\r\nInternal Temperature:  -2.5 C\r\n";
        let status = StatusSnapshot::parse(raw.as_bytes());

        assert!(status.true_rms_current.is_none());
        assert_eq!(status.internal_temperature.as_deref(), Some("-2.5 C"));
    }

    #[test]
    fn test_first_match_wins() {
        let raw = "Circuit Breaker: On\r\nCircuit Breaker: Off\r\n";
        let status = StatusSnapshot::parse(raw.as_bytes());
        assert_eq!(status.circuit_breaker.as_deref(), Some("On"));
    }

    #[test]
    fn test_breaker_value_does_not_cross_lines() {
        let raw = "Circuit Breaker:\r\n1)...port01 : On\r\n";
        let status = StatusSnapshot::parse(raw.as_bytes());
        assert!(status.circuit_breaker.is_none());
        assert_eq!(status.outlet(id(1)).state.as_deref(), Some("On"));
    }

    #[test]
    fn test_outlets_with_lf_cr_line_endings() {
        let raw = "Circuit Breaker: On\n\r1)...port01    : On \n\r2)...port02    : Off\n\r>";
        let status = StatusSnapshot::parse(raw.as_bytes());

        assert_eq!(status.circuit_breaker.as_deref(), Some("On"));
        assert_eq!(status.outlet(id(1)), &OutletEntry::new("port01", "On"));
        assert_eq!(status.outlet(id(2)), &OutletEntry::new("port02", "Off"));
        assert!(status.outlet(id(3)).is_empty());
    }

    #[test]
    fn test_outlets_with_cr_only_line_endings() {
        let raw = "Circuit Breaker: On\r1)...port01    : On \r2)...          : Off\r11)...x : On\r>";
        let status = StatusSnapshot::parse(raw.as_bytes());

        assert_eq!(status.outlet(id(1)), &OutletEntry::new("port01", "On"));
        assert_eq!(status.outlet(id(2)), &OutletEntry::new("Outlet 2", "Off"));
    }

    #[test]
    fn test_is_on() {
        assert!(OutletEntry::new("a", "On").is_on());
        assert!(OutletEntry::new("a", "ON").is_on());
        assert!(!OutletEntry::new("a", "Off").is_on());
        assert!(!OutletEntry::default().is_on());
    }

    #[test]
    fn test_snapshot_serializes_outlets_by_id() {
        let raw = "1)...port01 : On\n";
        let status = StatusSnapshot::parse(raw.as_bytes());
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["outlets"]["1"]["label"], "port01");
        assert_eq!(json["outlets"]["1"]["state"], "On");
        assert!(json["outlets"]["8"]["label"].is_null());
    }
}
