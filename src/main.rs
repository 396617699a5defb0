use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use detwatch::api::DetectionQuery;
use detwatch::cli::{self, OutputFormat};
use detwatch::{config, mock, web};

#[derive(Debug, Parser)]
#[command(name = "detwatch")]
#[command(about = "Dashboard and client for an object-detection service")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the web dashboard and start polling the services
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
        /// Do not open a browser window
        #[arg(long)]
        no_browser: bool,
    },
    /// Check connectivity and show per-service status
    Status {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show the headline dashboard metrics
    Metrics {
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// List detections, newest first
    Detections {
        /// Zero-based page number
        #[arg(long, default_value = "0")]
        page: u32,
        /// Page size
        #[arg(long, default_value = "20")]
        size: u32,
        /// Object category filter (`all` for none)
        #[arg(long)]
        category: Option<String>,
        /// Device filter
        #[arg(long)]
        device: Option<String>,
        /// Free-text search
        #[arg(long)]
        search: Option<String>,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show one detection with its objects
    Show {
        id: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Delete one detection record
    Delete { id: String },
    /// Upload an image file for detection
    Detect {
        file: PathBuf,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Run detection on a remote image URL
    DetectUrl {
        url: String,
        /// Output format: table (default), json
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Show detection statistics for a timeframe
    Stats {
        #[arg(long, default_value = "day")]
        timeframe: String,
    },
    /// Exit non-zero when the dashboard service is unreachable
    Probe,
    /// Serve randomized dashboard data for local development
    Mock {
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default config to ~/.detwatch/config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Set one key, e.g. `services.timeout_ms 5000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = App::parse();
    let mut cfg = config::load();
    let fmt = |f: &str| OutputFormat::from_str_opt(Some(f));

    match app.command {
        Commands::Serve { bind, no_browser } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            if no_browser {
                cfg.server.open_browser = false;
            }
            web::serve(&cfg)
        }
        Commands::Status { format } => cli::run_status(&cfg, fmt(&format)),
        Commands::Metrics { format } => cli::run_metrics(&cfg, fmt(&format)),
        Commands::Detections {
            page,
            size,
            category,
            device,
            search,
            format,
        } => {
            let query = DetectionQuery {
                page,
                size,
                category,
                device,
                search,
            };
            cli::run_detections(&cfg, &query, fmt(&format))
        }
        Commands::Show { id, format } => cli::run_show(&cfg, &id, fmt(&format)),
        Commands::Delete { id } => cli::run_delete(&cfg, &id),
        Commands::Detect { file, format } => cli::run_detect(&cfg, &file, fmt(&format)),
        Commands::DetectUrl { url, format } => cli::run_detect_url(&cfg, &url, fmt(&format)),
        Commands::Stats { timeframe } => cli::run_stats(&cfg, &timeframe),
        Commands::Probe => {
            if cli::run_probe(&cfg)? {
                Ok(())
            } else {
                std::process::exit(1)
            }
        }
        Commands::Mock { bind } => mock::serve(&bind),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
