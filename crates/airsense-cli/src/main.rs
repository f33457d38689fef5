use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use airsense_core::persist::JsonFileStore;
use airsense_core::{
    ConnectivityService, ScanOptions, SensorStore, StoreEvent, SyntheticTransport,
};
use airsense_types::{AlertThresholds, SensorReading, SettingsPatch, quality};

#[derive(Parser)]
#[command(name = "airsense")]
#[command(author, version, about = "CLI for AirSense air-quality sensors", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use the synthetic data generator instead of Bluetooth
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for nearby AirSense devices
    Scan {
        /// Scan timeout in seconds
        #[arg(short, long, default_value = "10")]
        timeout: u64,

        /// Report all BLE devices, not just AirSense
        #[arg(long)]
        all: bool,
    },

    /// Connect to a device and stream readings
    Watch {
        /// Device identifier (address or name); scans for one when omitted
        #[arg(short, long)]
        device: Option<String>,

        /// Output readings as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Compute the air-quality score for given metric values
    Score {
        /// CO₂ concentration in ppm
        #[arg(long)]
        co2: u16,

        /// VOC index (0-500)
        #[arg(long)]
        voc: u16,

        /// NOx index (0-500)
        #[arg(long)]
        nox: u16,
    },

    /// Show or change persisted application settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings as JSON
    Show,

    /// Update settings; only the given fields change
    Set {
        /// Desired update interval in seconds
        #[arg(long)]
        update_interval: Option<u32>,

        /// Enable or disable notifications
        #[arg(long)]
        notifications: Option<bool>,

        /// Enable or disable dark mode
        #[arg(long)]
        dark_mode: Option<bool>,

        /// CO₂ warning threshold (ppm)
        #[arg(long)]
        co2_warning: Option<u16>,

        /// CO₂ critical threshold (ppm)
        #[arg(long)]
        co2_critical: Option<u16>,

        /// VOC warning threshold
        #[arg(long)]
        voc_warning: Option<u16>,

        /// VOC critical threshold
        #[arg(long)]
        voc_critical: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Scan { timeout, all } => scan(cli.demo, timeout, all).await,
        Commands::Watch { device, json } => watch(cli.demo, device, json).await,
        Commands::Score { co2, voc, nox } => {
            print_score(co2, voc, nox);
            Ok(())
        }
        Commands::Settings { action } => settings(action).await,
    }
}

async fn new_store() -> Result<Arc<SensorStore>> {
    let persistence = JsonFileStore::new().context("no config directory for settings")?;
    let store = Arc::new(SensorStore::new(Arc::new(persistence)));
    store.load_settings().await?;
    Ok(store)
}

async fn new_service(demo: bool, store: Arc<SensorStore>) -> Result<ConnectivityService> {
    if demo {
        Ok(ConnectivityService::with_transport(
            Arc::new(SyntheticTransport::new()),
            store,
        ))
    } else {
        Ok(ConnectivityService::start(store).await?)
    }
}

async fn scan(demo: bool, timeout: u64, all: bool) -> Result<()> {
    let store = new_store().await?;
    let service = new_service(demo, Arc::clone(&store)).await?;
    println!("Scanning via {} transport for {}s...", service.mode(), timeout);

    let mut options = ScanOptions::new().timeout(Duration::from_secs(timeout));
    if all {
        options = options.all_devices();
    }
    service.start_scan(options).await?;

    // Print devices as they show up; the transport stops on its own
    let mut seen = HashSet::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout) + Duration::from_millis(500);
    while tokio::time::Instant::now() < deadline {
        for device in store.available_devices() {
            if seen.insert(device.id.clone()) {
                println!(
                    "  {} {} (rssi {})",
                    device.id,
                    device.name,
                    device
                        .rssi
                        .map_or_else(|| "n/a".to_string(), |r| r.to_string()),
                );
            }
        }
        if !store.is_scanning() && !seen.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    if seen.is_empty() {
        println!("No devices found");
    } else {
        println!("Found {} device(s)", seen.len());
    }
    service.shutdown().await?;
    Ok(())
}

async fn watch(demo: bool, device: Option<String>, json: bool) -> Result<()> {
    let store = new_store().await?;
    let service = new_service(demo, Arc::clone(&store)).await?;

    let device_id = match device {
        Some(id) => id,
        None => discover_first(&service).await?,
    };

    let mut events = store.subscribe();
    let info = service.connect(&device_id).await?;
    println!(
        "Connected to {} ({}){}",
        info.name,
        info.id,
        info.battery_level
            .map_or_else(String::new, |b| format!(", battery {}%", b)),
    );
    println!("Streaming readings, Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => {
                match event {
                    Ok(StoreEvent::ReadingUpdated { reading }) => {
                        if json {
                            println!("{}", serde_json::to_string(&reading)?);
                        } else {
                            print_reading(&reading);
                        }
                    }
                    Ok(StoreEvent::AlertRaised { alert }) => {
                        eprintln!("[{}] {}", alert.severity.title(), alert.message);
                        for recommendation in &alert.recommendations {
                            eprintln!("  - {}", recommendation);
                        }
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }
        }
    }

    service.shutdown().await?;
    Ok(())
}

/// Scan until the first device appears and return its id.
async fn discover_first(service: &ConnectivityService) -> Result<String> {
    let timeout = Duration::from_secs(10);
    println!("No device given, scanning...");
    service
        .start_scan(ScanOptions::new().timeout(timeout))
        .await?;

    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Some(device) = service.store().available_devices().into_iter().next() {
            service.stop_scan().await?;
            return Ok(device.id);
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    bail!("no AirSense device found within {:?}", timeout);
}

fn print_reading(reading: &SensorReading) {
    let score = quality::overall_score(reading.co2, reading.voc, reading.nox);
    let timestamp = reading
        .captured_at()
        .map_or_else(|| "-".to_string(), |t| t.to_string());
    println!(
        "{} | CO₂ {} ppm ({}) | {:.1} °C | {:.0}% RH | VOC {} | NOx {} | score {} ({})",
        timestamp,
        reading.co2,
        quality::co2_level(reading.co2),
        reading.temperature,
        reading.humidity,
        reading.voc,
        reading.nox,
        score,
        quality::score_band(score).label(),
    );
}

fn print_score(co2: u16, voc: u16, nox: u16) {
    let score = quality::overall_score(co2, voc, nox);
    println!("score: {} ({})", score, quality::score_band(score).label());
    println!("  co2: {} ppm -> {}", co2, quality::co2_level(co2));
    println!("  voc: {} -> {}", voc, quality::voc_level(voc));
    println!("  nox: {} -> {}", nox, quality::nox_level(nox));
}

async fn settings(action: SettingsAction) -> Result<()> {
    let store = new_store().await?;

    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&store.settings())?);
        }
        SettingsAction::Set {
            update_interval,
            notifications,
            dark_mode,
            co2_warning,
            co2_critical,
            voc_warning,
            voc_critical,
        } => {
            let current = store.settings().thresholds;
            let thresholds = if co2_warning.is_some()
                || co2_critical.is_some()
                || voc_warning.is_some()
                || voc_critical.is_some()
            {
                Some(AlertThresholds {
                    co2_warning: co2_warning.unwrap_or(current.co2_warning),
                    co2_critical: co2_critical.unwrap_or(current.co2_critical),
                    voc_warning: voc_warning.unwrap_or(current.voc_warning),
                    voc_critical: voc_critical.unwrap_or(current.voc_critical),
                })
            } else {
                None
            };

            store
                .update_settings(SettingsPatch {
                    update_interval_secs: update_interval,
                    notifications_enabled: notifications,
                    dark_mode,
                    thresholds,
                    ..SettingsPatch::default()
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&store.settings())?);
        }
    }
    Ok(())
}
