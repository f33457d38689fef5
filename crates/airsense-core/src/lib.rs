//! Connectivity and state management for AirSense air-quality sensors.
//!
//! This crate contains everything between the radio and the UI:
//!
//! - **Transports**: real Bluetooth Low Energy ([`BleTransport`]) and a
//!   synthetic generator ([`SyntheticTransport`]), both behind the uniform
//!   [`SensorTransport`] contract
//! - **Reading assembly**: merging per-characteristic notifications into
//!   atomic readings ([`ReadingAssembler`])
//! - **State**: the bounded-history [`SensorStore`] with derived threshold
//!   alerts and broadcast events
//! - **Persistence**: string-key settings storage ([`persist::KeyValueStore`])
//! - **Orchestration**: [`ConnectivityService`], which probes the adapter at
//!   startup and falls back to synthetic data when Bluetooth is unusable
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use airsense_core::{ConnectivityService, SensorStore, persist::JsonFileStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SensorStore::new(Arc::new(JsonFileStore::new()?)));
//!     store.load_settings().await?;
//!
//!     // Picks BLE when an adapter is present, synthetic data otherwise
//!     let service = ConnectivityService::start(Arc::clone(&store)).await?;
//!     println!("Transport: {}", service.mode());
//!
//!     let mut events = store.subscribe();
//!     service.connect("demo-device-001").await?;
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod error;
pub mod events;
pub mod native;
pub mod persist;
pub mod service;
pub mod store;
pub mod synthetic;
pub mod transport;

pub use error::{ConnectionFailureReason, DeviceNotFoundReason, Error, Result};
pub use events::{
    DisconnectReason, EventDispatcher, StoreEvent, TransportEvent, TransportEventReceiver,
    TransportEventSender,
};
pub use native::BleTransport;
pub use service::ConnectivityService;
pub use store::{HISTORY_CAP, SensorStore};
pub use synthetic::{GeneratorState, SyntheticTransport};
pub use transport::{ScanOptions, SensorTransport, TransportMode};

// Re-export the shared data model
pub use airsense_types::{
    Alert, AlertKind, AlertSeverity, AlertThresholds, AppSettings, DeviceInfo, Metric,
    MetricValue, ReadingAssembler, SensorReading, SettingsPatch,
};
