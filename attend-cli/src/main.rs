//! Attend Command Line Interface
//!
//! Usage:
//!   attend serve      - Start the API server
//!   attend secret     - Generate a participant secret
//!   attend issue      - Issue a signed QR payload
//!   attend verify     - Verify a QR payload against a secret
//!   attend classify   - Classify an arrival against a start time
//!   attend scan       - Submit a payload to a running server
//!   attend status     - Show server status

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use attend_core::logging::LogLevel;

mod commands;

#[derive(Parser)]
#[command(name = "attend")]
#[command(about = "QR attendance engine CLI")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server (other settings come from ATTEND_* variables)
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Storage backend (memory, sled)
        #[arg(long)]
        storage: Option<String>,
        /// Sled data directory
        #[arg(long)]
        data_dir: Option<String>,
        /// Venue offset from UTC in minutes
        #[arg(long, allow_hyphen_values = true)]
        utc_offset_minutes: Option<i32>,
        /// Reject payloads older than this many days
        #[arg(long)]
        max_age_days: Option<u32>,
    },

    /// Generate a new participant secret (hex)
    Secret,

    /// Issue a signed QR payload
    Issue {
        /// Participant external ID (e.g. student number)
        #[arg(short, long)]
        external_id: String,
        /// Participant secret (hex)
        #[arg(short, long)]
        secret: String,
        /// Issue time in epoch seconds (default now)
        #[arg(short, long)]
        timestamp: Option<i64>,
    },

    /// Verify a QR payload against a participant secret
    Verify {
        /// Raw payload text
        #[arg(short, long)]
        payload: String,
        /// Participant secret (hex)
        #[arg(short, long)]
        secret: String,
        /// Also check the payload age
        #[arg(long)]
        max_age_days: Option<u32>,
    },

    /// Classify an arrival as PRESENT or LATE
    Classify {
        /// Scheduled start (HH:MM)
        #[arg(long)]
        start: String,
        /// Grace period in minutes
        #[arg(long, default_value = "15")]
        grace: u32,
        /// Arrival time (RFC 3339, default now in UTC)
        #[arg(long)]
        at: Option<String>,
    },

    /// Submit a scan to a running server
    Scan {
        /// API server URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        api_url: String,
        /// Activity ID
        #[arg(long)]
        activity_id: String,
        /// Raw payload text
        #[arg(short, long)]
        payload: String,
        /// Scanning station ID
        #[arg(long)]
        station_id: Option<String>,
    },

    /// Show server status
    Status {
        /// API server URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        api_url: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = LogLevel::from_str(&cli.log_level).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.filter_directive())),
        )
        .init();

    if let Err(e) = run_command(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(cli: Cli) -> commands::CmdResult {
    match cli.command {
        Commands::Serve {
            host,
            port,
            storage,
            data_dir,
            utc_offset_minutes,
            max_age_days,
        } => {
            let overrides = commands::ServeOverrides {
                host,
                port,
                storage,
                data_dir,
                utc_offset_minutes,
                max_age_days,
            };
            commands::handle_serve(overrides).await
        }

        Commands::Secret => {
            println!("{}", commands::generate_secret());
            Ok(())
        }

        Commands::Issue {
            external_id,
            secret,
            timestamp,
        } => {
            println!("{}", commands::issue_payload(&external_id, &secret, timestamp)?);
            Ok(())
        }

        Commands::Verify {
            payload,
            secret,
            max_age_days,
        } => {
            let verdict = commands::verify_payload(&payload, &secret, max_age_days)?;
            println!("{}", verdict);
            if verdict.is_valid() {
                Ok(())
            } else {
                Err(format!("payload rejected: {}", verdict).into())
            }
        }

        Commands::Classify { start, grace, at } => {
            println!("{}", commands::classify_arrival(&start, grace, at.as_deref())?);
            Ok(())
        }

        Commands::Scan {
            api_url,
            activity_id,
            payload,
            station_id,
        } => commands::handle_scan(&api_url, &activity_id, &payload, station_id).await,

        Commands::Status { api_url } => commands::handle_status(&api_url).await,
    }
}
