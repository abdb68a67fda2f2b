//! # wayfront - protocol server
//!
//! Runs the protocol runtime headless: globals are advertised, scheduled
//! work is drained on the protocol thread, and Ctrl-C shuts it down. The
//! transport that feeds client bytes in lives outside this binary.

use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};
use std::time::Duration;
use wayfront::config::WayfrontConfig;
use wayfront::{logging, Display};

/// How often scheduled work is drained when nothing else wakes the loop
const WORK_TICK: Duration = Duration::from_millis(4);

#[derive(Parser)]
#[command(name = "wayfront")]
#[command(about = "Wayland-style protocol object runtime with xdg-shell, layer shell and pointer routing")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/wayfront/wayfront.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print the advertised globals and exit
    #[arg(long)]
    list_globals: bool,
}

fn load_config(path: &str) -> (WayfrontConfig, Option<anyhow::Error>) {
    let expanded = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => std::path::Path::new(&home).join(rest),
        _ => std::path::PathBuf::from(path),
    };
    match WayfrontConfig::load_or_default(&expanded) {
        Ok(config) => (config, None),
        Err(e) => (WayfrontConfig::default(), Some(e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config comes first so its log level can seed the logger
    let (config, load_error) = load_config(&cli.config);
    logging::init(&config.logging, cli.debug);

    info!("🚀 Starting wayfront");
    info!(
        "📄 Version: {} ({}, built {} for {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT"),
        env!("BUILD_DATE"),
        env!("TARGET_TRIPLE")
    );

    match load_error {
        None => info!("✅ Configuration loaded from: {}", cli.config),
        Some(e) => {
            error!("❌ Failed to load configuration: {:#}", e);
            info!("📝 Using default configuration");
        }
    }

    let mut display = Display::new(&config)?;

    if cli.list_globals {
        for global in display.globals() {
            println!(
                "{:>4}  {:<24} v{}",
                global.id.name(),
                global.interface.name(),
                global.max_version
            );
        }
        return Ok(());
    }

    let mut tick = tokio::time::interval(WORK_TICK);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let ran = display.run_pending_work();
                if ran > 0 {
                    debug!("Ran {} scheduled work items", ran);
                }
                for client in display.flush_closed() {
                    info!("🔌 Dropped closed connection {:?}", client);
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("❌ Failed to listen for Ctrl-C: {}", e);
                }
                info!("🛑 Shutting down");
                break;
            }
        }
    }

    Ok(())
}
