//! `rpc4`: query and switch a BayTech RPC-4 from the command line.
//!
//! Every invocation opens a session, performs one operation and closes the
//! session again, so concurrent invocations against the same unit never
//! share a connection.

mod output;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use clap::{ArgAction, Parser, Subcommand};
use rpc4_client::{
    describe_metrics, ClientError, FlowControlFlags, OutletAction, PromptMatch, Rpc4Client,
    SessionConfig, DEFAULT_DEVICE,
};
use rpc4_protocol::OutletId;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line interface for a BayTech RPC-4 power distribution unit.
#[derive(Parser, Debug)]
#[command(name = "rpc4", version, about)]
struct Cli {
    /// YAML session config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial device (overrides the config file).
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Baud rate.
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Read timeout in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Command prompt printed by the unit.
    #[arg(long, global = true)]
    prompt: Option<String>,

    /// Only accept the prompt at the start of a line.
    #[arg(long, global = true)]
    prompt_at_line_start: bool,

    /// Enable XON/XOFF flow control.
    #[arg(long, global = true)]
    xonxoff: bool,

    /// Enable RTS/CTS flow control.
    #[arg(long, global = true)]
    rtscts: bool,

    /// Enable DSR/DTR handshaking.
    #[arg(long, global = true)]
    dsrdtr: bool,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the status report.
    Status {
        /// Only show this outlet.
        #[arg(long, allow_negative_numbers = true)]
        outlet: Option<i64>,
    },
    /// Turn an outlet (or all outlets) on.
    On {
        /// Outlet number 1-8, or "all".
        #[arg(allow_negative_numbers = true)]
        target: OutletTarget,
    },
    /// Turn an outlet (or all outlets) off.
    Off {
        /// Outlet number 1-8, or "all".
        #[arg(allow_negative_numbers = true)]
        target: OutletTarget,
    },
}

/// Outlet argument: one number or every outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutletTarget {
    All,
    One(i64),
}

impl FromStr for OutletTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(OutletTarget::All);
        }
        s.parse::<i64>()
            .map(OutletTarget::One)
            .map_err(|_| format!("expected an outlet number or 'all', got '{}'", s))
    }
}

impl Cli {
    /// Build the session config: file first, then flags.
    fn session_config(&self) -> Result<SessionConfig, String> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_yaml_file(path).map_err(|e| e.to_string())?,
            None => SessionConfig::new(DEFAULT_DEVICE),
        };

        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(prompt) = &self.prompt {
            config.command_prompt = prompt.clone();
        }
        if self.prompt_at_line_start {
            config.prompt_match = PromptMatch::LineStart;
        }
        if self.xonxoff || self.rtscts || self.dsrdtr {
            config.flow_control = FlowControlFlags {
                xonxoff: self.xonxoff,
                rtscts: self.rtscts,
                dsrdtr: self.dsrdtr,
            };
        }

        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Failures after the session is open.
#[derive(Debug, Error)]
enum RunError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("cannot render status: {0}")]
    Render(#[from] serde_json::Error),

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

fn write_output(out: &mut impl Write, text: &str) -> Result<(), RunError> {
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn run_command(client: &mut Rpc4Client, cli: &Cli) -> Result<(), RunError> {
    match &cli.command {
        Commands::Status { outlet } => {
            let reply = client.get_status(*outlet)?;
            let text = output::render_reply(&reply, *outlet, cli.json)?;
            write_output(&mut io::stdout().lock(), &text)?;
        }
        Commands::On { target } => switch(client, *target, OutletAction::On)?,
        Commands::Off { target } => switch(client, *target, OutletAction::Off)?,
    }
    Ok(())
}

fn switch(client: &mut Rpc4Client, target: OutletTarget, action: OutletAction) -> Result<(), ClientError> {
    match target {
        OutletTarget::All => {
            info!("Switching all outlets {}", action);
            client.set_all(action)
        }
        OutletTarget::One(id) => {
            if OutletId::try_from(id).is_err() {
                eprintln!("Outlet {} does not exist; nothing sent", id);
            }
            info!("Switching outlet {} {}", id, action);
            client.set_outlet(id, action)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    describe_metrics();

    let config = match cli.session_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(2);
        }
    };
    debug!("Session config: {:?}", config);

    let mut client = Rpc4Client::new(config);
    if let Err(e) = client.connect() {
        eprintln!("Device unreachable: {}", e);
        return ExitCode::from(1);
    }

    let result = run_command(&mut client, &cli);
    client.close();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Command failed: {}", e);
            ExitCode::from(1)
        }
    }
}
