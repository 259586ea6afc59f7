//! Rendering of replies for the terminal.

use std::fmt::Write;

use rpc4_client::{OutletEntry, StatusReply, StatusSnapshot};
use rpc4_protocol::StatusField;
use serde::Serialize;

/// Parse the numeric part of a temperature like "33.5 C".
pub fn temperature_celsius(snapshot: &StatusSnapshot) -> Option<f64> {
    snapshot
        .internal_temperature
        .as_deref()?
        .trim()
        .trim_end_matches('C')
        .trim()
        .parse()
        .ok()
}

/// Convert Celsius to Fahrenheit.
pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Snapshot plus derived values, for JSON output.
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    #[serde(flatten)]
    pub snapshot: &'a StatusSnapshot,
    pub temperature_c: Option<f64>,
    pub temperature_f: Option<f64>,
}

impl<'a> StatusView<'a> {
    pub fn new(snapshot: &'a StatusSnapshot) -> Self {
        let temperature_c = temperature_celsius(snapshot);
        StatusView {
            snapshot,
            temperature_c,
            temperature_f: temperature_c.map(celsius_to_fahrenheit),
        }
    }
}

fn outlet_line(out: &mut String, id: i64, entry: &OutletEntry) {
    let label = entry.label.as_deref().unwrap_or("-");
    let state = entry.state.as_deref().unwrap_or("?");
    let _ = writeln!(out, "  {}  {:<16} {}", id, label, state);
}

/// Render a snapshot as aligned text.
pub fn render_snapshot(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();

    for field in StatusField::ALL {
        let Some(value) = snapshot.field(field) else {
            continue;
        };
        let value = match field {
            StatusField::TrueRmsCurrent | StatusField::MaximumDetected => format!("{} A", value),
            StatusField::InternalTemperature => match temperature_celsius(snapshot) {
                Some(c) => format!("{} ({:.1} F)", value, celsius_to_fahrenheit(c)),
                None => value.to_string(),
            },
            _ => value.to_string(),
        };
        let _ = writeln!(out, "{:<22}{}", format!("{}:", field.label()), value);
    }

    out.push_str("Outlets:\n");
    for (id, entry) in &snapshot.outlets {
        outlet_line(&mut out, i64::from(*id), entry);
    }
    out
}

/// Render a status reply as text or JSON.
pub fn render_reply(reply: &StatusReply, outlet: Option<i64>, json: bool) -> serde_json::Result<String> {
    if json {
        return match reply {
            StatusReply::Snapshot(s) => serde_json::to_string_pretty(&StatusView::new(s)),
            other => serde_json::to_string_pretty(other),
        };
    }

    Ok(match (reply, outlet) {
        (StatusReply::Snapshot(s), _) => render_snapshot(s),
        (StatusReply::Outlet(entry), Some(id)) => {
            let mut out = String::new();
            outlet_line(&mut out, id, entry);
            out
        }
        _ => String::from("No such outlet\n"),
    })
}
