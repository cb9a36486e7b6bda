//! Vessel Tracker CLI
//!
//! Vessel particulars and best-known AIS position by IMO number.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vessel_core::{Imo, VesselReport};
use vessel_runtime::server::{self, AppState};
use vessel_runtime::{Tracker, TrackerConfig};

#[derive(Parser)]
#[command(name = "vessel-tracker")]
#[command(
    author,
    version,
    about = "Vessel Tracker: IMO lookup with multi-source AIS positions",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3), ignored when LOG_LEVEL is set
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(short, long, env = "VESSEL_TRACKER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// AISStream API key (or set AISSTREAM_API_KEY env var)
    #[arg(long, env = "AISSTREAM_API_KEY", global = true, hide_env_values = true)]
    aisstream_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Listen address
        #[arg(long, env = "VESSEL_TRACKER_ADDR", default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
    },

    /// Look one vessel up and print the report
    Lookup {
        /// IMO number
        #[arg(short, long)]
        imo: String,

        /// Print the raw JSON report
        #[arg(long)]
        json: bool,
    },

    /// Validate an IMO number offline
    CheckImo {
        /// IMO number
        imo: String,
    },

    /// Check that the primary source is reachable
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::CheckImo { imo } => check_imo(&imo),
        Commands::Serve { addr } => {
            let config = load_config(cli.config, cli.aisstream_key)?;
            serve(addr, config).await
        }
        Commands::Lookup { imo, json } => {
            let config = load_config(cli.config, cli.aisstream_key)?;
            lookup(&imo, json, config).await
        }
        Commands::Status => {
            let config = load_config(cli.config, cli.aisstream_key)?;
            check_status(config).await
        }
    }
}

/// Defaults, then the TOML file, then flags and env vars
fn load_config(path: Option<PathBuf>, aisstream_key: Option<String>) -> Result<TrackerConfig> {
    let mut config = match path {
        Some(path) => TrackerConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    if let Some(key) = aisstream_key.filter(|k| !k.trim().is_empty()) {
        config.live_feed.api_key = Some(key);
    }

    config.validate()?;
    Ok(config)
}

async fn serve(addr: SocketAddr, config: TrackerConfig) -> Result<()> {
    let tracker = Tracker::new(&config)?;
    let state = Arc::new(AppState::new(tracker, config.live_feed.clone()));
    server::start(addr, state).await
}

async fn lookup(imo: &str, json: bool, config: TrackerConfig) -> Result<()> {
    let tracker = Tracker::new(&config)?;
    let report = tracker.lookup(imo).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &VesselReport) {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    println!("🚢 {} (IMO {})", field(&report.vessel_name), report.imo);
    println!("   MMSI:        {}", field(&report.mmsi));
    println!("   Type:        {}", field(&report.ship_type));
    println!("   Flag:        {}", field(&report.flag));
    println!("   Destination: {}", field(&report.destination));

    match (report.lat, report.lon) {
        (Some(lat), Some(lon)) => {
            println!("📍 Position:    {:.5}, {:.5} ({})", lat, lon, report.ais_source);
            if let Some(sog) = report.sog {
                println!("   Speed:       {} kn", sog);
            }
            if let Some(cog) = report.cog {
                println!("   Course:      {}°", cog);
            }
            println!("   Reported:    {}", field(&report.last_pos_utc));
        }
        _ => println!("⚠️  No position available"),
    }

    println!("   Draught:     {}", field(&report.draught_m));
    println!("   Deadweight:  {}", field(&report.deadweight_t));
    println!("   Gross tons:  {}", field(&report.gross_tonnage));
    println!("   Built:       {}", field(&report.year_of_build));
    println!("   Length:      {}", field(&report.length_overall_m));
    println!("   Beam:        {}", field(&report.beam_m));
}

fn check_imo(raw: &str) -> Result<()> {
    match Imo::parse(raw) {
        Ok(imo) => {
            println!("✅ {} is a valid IMO number", imo);
            Ok(())
        }
        Err(e) => bail!("❌ {}", e),
    }
}

async fn check_status(config: TrackerConfig) -> Result<()> {
    println!("🔌 Checking primary source at {}...\n", config.http.page_base_url);

    let tracker = Tracker::new(&config)?;
    match tracker.primary().check_reachable().await {
        Ok(true) => println!("✅ Primary source is reachable"),
        Ok(false) => println!("❌ Primary source is unreachable or failing"),
        Err(e) => println!("❌ Error checking primary source: {}", e),
    }

    if config.live_feed.api_key().is_some() {
        println!("📡 Live feed: enabled ({})", config.live_feed.url);
    } else {
        println!("📡 Live feed: disabled (set AISSTREAM_API_KEY to enable)");
    }

    Ok(())
}
