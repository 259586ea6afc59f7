//! Metric names recorded by the client.
//!
//! The library only records through the `metrics` facade; installing a
//! recorder is up to the application.

use metrics::{describe_counter, Unit};

/// Commands written to a unit, labelled by `device` and `command`.
pub const COMMANDS_SENT: &str = "rpc4.commands.sent";

/// Reads that hit the timeout before the prompt arrived, labelled by `device`.
pub const READ_TIMEOUTS: &str = "rpc4.read.timeouts";

/// Failed connection attempts, labelled by `device`.
pub const CONNECT_FAILURES: &str = "rpc4.connect.failures";

/// Register descriptions for every client metric.
pub fn describe_metrics() {
    describe_counter!(COMMANDS_SENT, Unit::Count, "Commands written to the unit");
    describe_counter!(
        READ_TIMEOUTS,
        Unit::Count,
        "Reads that timed out waiting for the command prompt"
    );
    describe_counter!(CONNECT_FAILURES, Unit::Count, "Failed connection attempts");
}
