//! ledlink CLI binary.
//!
//! Line protocol client for LED pixel hosts.
//!
//! # Commands
//!
//! - `parse` - Parse protocol lines and print their structure
//! - `send` - Connect, send lines and exit
//! - `listen` - Connect and print every incoming message

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use ledlink::{
    parse_line, transport::DEFAULT_TICK, Client, Config, ConnectionConfig, LogLifecycle, VERSION,
};

#[derive(Parser)]
#[command(name = "ledlink")]
#[command(version = VERSION)]
#[command(about = "ledlink - line protocol client for LED pixel hosts", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Connection options shared by the networked commands
#[derive(clap::Args)]
struct Endpoint {
    /// LED host name or address
    #[arg(long)]
    host: Option<String>,

    /// LED host port
    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (default: <config dir>/ledlink/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse protocol lines and print their structure
    Parse {
        /// Line to parse (or - for stdin, one message per line)
        line: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect, send lines and exit
    Send {
        #[command(flatten)]
        endpoint: Endpoint,

        /// Wait for the host greeting before sending
        #[arg(short, long)]
        wait_welcome: bool,

        /// Give up waiting for the greeting after this many milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,

        /// Lines to send, in order
        #[arg(required = true)]
        lines: Vec<String>,
    },

    /// Connect and print every incoming message until the host disconnects
    Listen {
        #[command(flatten)]
        endpoint: Endpoint,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Parse { line, json } => cmd_parse(&line, json),
        Commands::Send {
            endpoint,
            wait_welcome,
            timeout_ms,
            lines,
        } => cmd_send(&endpoint, wait_welcome, timeout_ms, &lines),
        Commands::Listen { endpoint } => cmd_listen(&endpoint),
    }
}

fn init_logging(verbose: bool, json: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cmd_parse(input: &str, json: bool) -> anyhow::Result<()> {
    let lines: Vec<String> = if input == "-" {
        io::stdin().lock().lines().collect::<io::Result<_>>()?
    } else {
        vec![input.to_string()]
    };

    let mut failed = false;
    for line in &lines {
        match parse_line(line) {
            Ok(Some(message)) if json => println!("{}", serde_json::to_string_pretty(&message)?),
            Ok(Some(message)) => println!("{}", message.report()),
            Ok(None) => {},
            Err(err) => {
                eprintln!("{err}");
                failed = true;
            },
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_send(
    endpoint: &Endpoint,
    wait_welcome: bool,
    timeout_ms: u64,
    lines: &[String],
) -> anyhow::Result<()> {
    let messages = lines
        .iter()
        .filter_map(|line| parse_line(line).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    let config = resolve_config(endpoint)?;
    let mut client = Client::connect(&config, LogLifecycle)?;

    if wait_welcome {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        if !client.run_until(|c| c.is_ready(), Some(deadline))? {
            anyhow::bail!(
                "{} did not send its greeting within {timeout_ms} ms",
                config.addr()
            );
        }
    }

    for message in &messages {
        client.send(message)?;
    }
    client.flush()?;
    tracing::info!(
        "Sent {} message(s) to {}",
        messages.len(),
        client.session().addr()
    );
    client.disconnect();
    Ok(())
}

fn cmd_listen(endpoint: &Endpoint) -> anyhow::Result<()> {
    let config = resolve_config(endpoint)?;
    let mut client = Client::connect(&config, LogLifecycle)?;
    client.on_any(|_, message| {
        print!("{message}");
        Ok(())
    });
    client.run()?;
    Ok(())
}

/// Defaults, then the config file, then the environment, then flags
fn resolve_config(endpoint: &Endpoint) -> anyhow::Result<ConnectionConfig> {
    let file = match &endpoint.config {
        Some(path) => Config::from_file(path)?,
        None => match Config::default_path().filter(|p| p.exists()) {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        },
    };

    let mut flags = Config::default();
    if let Some(host) = &endpoint.host {
        flags.connection.host.clone_from(host);
    }
    if let Some(port) = endpoint.port {
        flags.connection.port = port;
    }

    let mut connection = file.merge(Config::from_env()).merge(flags).connection;
    if connection.poll_timeout_ms.is_none() {
        connection.poll_timeout_ms = Some(DEFAULT_TICK.as_millis() as u64);
    }
    Ok(connection)
}
