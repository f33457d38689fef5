//! Synthetic reading generator for hosts without Bluetooth.
//!
//! [`SyntheticTransport`] implements the full [`SensorTransport`] contract
//! against a bounded random walk instead of real hardware. It exists so the
//! application works end to end on machines without a BLE adapter and so
//! tests can exercise the whole pipeline deterministically.
//!
//! The walk itself lives in [`GeneratorState`], a pure struct that can be
//! stepped in tests without timers or tasks.

use std::sync::{Arc, Mutex as StdMutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::{interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use airsense_types::{DeviceInfo, SensorReading, epoch_ms_now};

use crate::error::{Error, Result};
use crate::events::{
    DisconnectReason, EventDispatcher, TransportEvent, TransportEventReceiver,
};
use crate::transport::{ScanOptions, SensorTransport, TransportMode};

/// Identifier of the synthetic device.
pub const SYNTHETIC_DEVICE_ID: &str = "demo-device-001";

/// Name of the synthetic device.
pub const SYNTHETIC_DEVICE_NAME: &str = "AirSense Demo";

const SYNTHETIC_RSSI: i16 = -45;
const DISCOVERY_DELAY: Duration = Duration::from_secs(1);
const CONNECT_DELAY: Duration = Duration::from_secs(1);

/// Bounded random walk over the five metrics.
///
/// Each step nudges every metric by a uniform delta in `±step/2` and clamps
/// it to a realistic range, so synthetic data drifts plausibly instead of
/// jumping around.
#[derive(Debug, Clone)]
pub struct GeneratorState {
    co2: f64,
    voc: f64,
    nox: f64,
    temperature: f64,
    humidity: f64,
}

impl Default for GeneratorState {
    fn default() -> Self {
        Self {
            co2: 650.0,
            voc: 120.0,
            nox: 85.0,
            temperature: 22.4,
            humidity: 48.0,
        }
    }
}

impl GeneratorState {
    /// Current state as a reading, without advancing the walk.
    pub fn current(&self, timestamp_ms: i64) -> SensorReading {
        SensorReading {
            co2: self.co2.round() as u16,
            voc: self.voc.round() as u16,
            nox: self.nox.round() as u16,
            temperature: ((self.temperature * 10.0).round() / 10.0) as f32,
            humidity: self.humidity.round() as f32,
            timestamp_ms,
        }
    }

    /// Advance the walk one step and return the resulting reading.
    pub fn step<R: Rng>(&mut self, rng: &mut R, timestamp_ms: i64) -> SensorReading {
        self.co2 = (self.co2 + rng.random_range(-0.5..=0.5) * 100.0).clamp(400.0, 2000.0);
        self.voc = (self.voc + rng.random_range(-0.5..=0.5) * 30.0).clamp(0.0, 500.0);
        self.nox = (self.nox + rng.random_range(-0.5..=0.5) * 20.0).clamp(0.0, 500.0);
        self.temperature =
            (self.temperature + rng.random_range(-0.5..=0.5) * 0.5).clamp(18.0, 28.0);
        self.humidity = (self.humidity + rng.random_range(-0.5..=0.5) * 2.0).clamp(30.0, 70.0);
        self.current(timestamp_ms)
    }
}

/// Sensor transport backed by the synthetic generator.
pub struct SyntheticTransport {
    dispatcher: EventDispatcher<TransportEvent>,
    state: StdMutex<GeneratorState>,
    update_interval: Duration,
    connected: AtomicBool,
    scanning: Arc<AtomicBool>,
    scan_cancel: StdMutex<Option<CancellationToken>>,
    stream_cancel: StdMutex<Option<CancellationToken>>,
    connect_busy: AtomicBool,
}

impl SyntheticTransport {
    /// Create a synthetic transport emitting a reading every 5 seconds.
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(5))
    }

    /// Create a synthetic transport with a custom update interval.
    pub fn with_interval(update_interval: Duration) -> Self {
        Self {
            dispatcher: EventDispatcher::default(),
            state: StdMutex::new(GeneratorState::default()),
            update_interval,
            connected: AtomicBool::new(false),
            scanning: Arc::new(AtomicBool::new(false)),
            scan_cancel: StdMutex::new(None),
            stream_cancel: StdMutex::new(None),
            connect_busy: AtomicBool::new(false),
        }
    }

    /// The canned device this transport discovers and connects to.
    pub fn device_info(connected: bool) -> DeviceInfo {
        DeviceInfo {
            id: SYNTHETIC_DEVICE_ID.to_string(),
            name: SYNTHETIC_DEVICE_NAME.to_string(),
            rssi: Some(SYNTHETIC_RSSI),
            is_connected: connected,
            battery_level: Some(100),
        }
    }

    fn cancel_streaming(&self) {
        if let Some(token) = self.stream_cancel.lock().expect("lock poisoned").take() {
            token.cancel();
        }
    }
}

impl Default for SyntheticTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorTransport for SyntheticTransport {
    fn mode(&self) -> TransportMode {
        TransportMode::Synthetic
    }

    async fn initialize(&self) -> Result<bool> {
        Ok(true)
    }

    async fn start_scan(&self, options: ScanOptions) -> Result<()> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ScanInProgress);
        }

        info!("Synthetic scan started");
        let token = CancellationToken::new();
        *self.scan_cancel.lock().expect("lock poisoned") = Some(token.clone());

        let dispatcher = self.dispatcher.clone();
        let scanning = Arc::clone(&self.scanning);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = sleep(DISCOVERY_DELAY) => {
                    dispatcher.send(TransportEvent::Discovered {
                        device: Self::device_info(false),
                    });
                }
            }
            tokio::select! {
                _ = token.cancelled() => {}
                _ = sleep(options.timeout.saturating_sub(DISCOVERY_DELAY)) => {
                    if scanning.swap(false, Ordering::SeqCst) {
                        debug!("Synthetic scan timed out");
                        dispatcher.send(TransportEvent::ScanStopped);
                    }
                }
            }
        });
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        if let Some(token) = self.scan_cancel.lock().expect("lock poisoned").take() {
            token.cancel();
        }
        if self.scanning.swap(false, Ordering::SeqCst) {
            debug!("Synthetic scan stopped");
            self.dispatcher.send(TransportEvent::ScanStopped);
        }
        Ok(())
    }

    async fn connect(&self, device_id: &str) -> Result<DeviceInfo> {
        if self
            .connect_busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ConnectInProgress);
        }

        sleep(CONNECT_DELAY).await;

        let mut info = Self::device_info(true);
        info.id = device_id.to_string();
        self.connected.store(true, Ordering::SeqCst);
        self.connect_busy.store(false, Ordering::SeqCst);

        info!(device_id, "Synthetic device connected");
        self.dispatcher.send(TransportEvent::Connected {
            device: info.clone(),
        });
        Ok(info)
    }

    async fn disconnect(&self) -> Result<()> {
        self.cancel_streaming();
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Synthetic device disconnected");
            self.dispatcher.send(TransportEvent::Disconnected {
                device_id: SYNTHETIC_DEVICE_ID.to_string(),
                reason: DisconnectReason::UserRequested,
            });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn start_streaming(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        // Replace any previous stream task
        self.cancel_streaming();
        let token = CancellationToken::new();
        *self.stream_cancel.lock().expect("lock poisoned") = Some(token.clone());

        // First reading goes out immediately from the unstepped walk
        let first = self
            .state
            .lock()
            .expect("lock poisoned")
            .current(epoch_ms_now());
        self.dispatcher
            .send(TransportEvent::Reading { reading: first });

        let dispatcher = self.dispatcher.clone();
        let update_interval = self.update_interval;
        let mut state = self.state.lock().expect("lock poisoned").clone();
        tokio::spawn(async move {
            let mut ticker = interval(update_interval);
            ticker.tick().await; // First tick fires immediately
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Synthetic stream cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        // ThreadRng is !Send, so grab the thread-local handle
                        // per tick instead of holding it across awaits.
                        let mut rng = rand::rng();
                        let reading = state.step(&mut rng, epoch_ms_now());
                        dispatcher.send(TransportEvent::Reading { reading });
                    }
                }
            }
        });
        Ok(())
    }

    fn subscribe_events(&self) -> TransportEventReceiver {
        self.dispatcher.subscribe()
    }

    async fn shutdown(&self) -> Result<()> {
        self.stop_scan().await?;
        self.disconnect().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generator_starts_at_baseline() {
        let state = GeneratorState::default();
        let reading = state.current(42);
        assert_eq!(reading.co2, 650);
        assert_eq!(reading.voc, 120);
        assert_eq!(reading.nox, 85);
        assert_eq!(reading.temperature, 22.4);
        assert_eq!(reading.humidity, 48.0);
        assert_eq!(reading.timestamp_ms, 42);
    }

    #[test]
    fn test_generator_stays_in_bounds() {
        let mut state = GeneratorState::default();
        let mut rng = StdRng::seed_from_u64(7);
        for i in 0..10_000 {
            let reading = state.step(&mut rng, i);
            assert!((400..=2000).contains(&reading.co2));
            assert!(reading.voc <= 500);
            assert!(reading.nox <= 500);
            assert!((18.0..=28.0).contains(&reading.temperature));
            assert!((30.0..=70.0).contains(&reading.humidity));
        }
    }

    #[test]
    fn test_generator_step_bounded_delta() {
        let mut state = GeneratorState::default();
        let mut rng = StdRng::seed_from_u64(1);
        let before = state.current(0);
        let after = state.step(&mut rng, 1);
        assert!((i32::from(after.co2) - i32::from(before.co2)).abs() <= 50);
        assert!((i32::from(after.voc) - i32::from(before.voc)).abs() <= 15);
        assert!((i32::from(after.nox) - i32::from(before.nox)).abs() <= 10);
    }

    #[tokio::test]
    async fn test_scan_guard_rejects_concurrent_scan() {
        let transport = SyntheticTransport::new();
        transport.start_scan(ScanOptions::default()).await.unwrap();
        let err = transport
            .start_scan(ScanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ScanInProgress));

        // After stopping, scanning is allowed again
        transport.stop_scan().await.unwrap();
        transport.start_scan(ScanOptions::default()).await.unwrap();
    }

    #[tokio::test]
    async fn test_scan_emits_demo_device() {
        let transport = SyntheticTransport::new();
        let mut events = transport.subscribe_events();
        transport.start_scan(ScanOptions::default()).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), events.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            TransportEvent::Discovered { device } => {
                assert_eq!(device.id, SYNTHETIC_DEVICE_ID);
                assert_eq!(device.name, SYNTHETIC_DEVICE_NAME);
                assert_eq!(device.rssi, Some(-45));
            }
            other => panic!("expected Discovered, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scan_stops_on_its_own_after_timeout() {
        let transport = SyntheticTransport::new();
        let mut events = transport.subscribe_events();
        transport
            .start_scan(ScanOptions::new().timeout(Duration::from_millis(1200)))
            .await
            .unwrap();

        let mut stopped = false;
        while let Ok(Ok(event)) =
            tokio::time::timeout(Duration::from_secs(3), events.recv()).await
        {
            if matches!(event, TransportEvent::ScanStopped) {
                stopped = true;
                break;
            }
        }
        assert!(stopped);

        // The flag is released, so a new scan is accepted
        transport.start_scan(ScanOptions::default()).await.unwrap();
        transport.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_streaming_requires_connection() {
        let transport = SyntheticTransport::new();
        assert!(matches!(
            transport.start_streaming().await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_then_stream_emits_first_reading_immediately() {
        let transport = SyntheticTransport::new();
        let mut events = transport.subscribe_events();

        let info = transport.connect(SYNTHETIC_DEVICE_ID).await.unwrap();
        assert!(info.is_connected);
        assert!(transport.is_connected());

        transport.start_streaming().await.unwrap();

        // Connected event first, then the initial reading without waiting a tick
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
                .await
                .unwrap()
                .unwrap();
            if let TransportEvent::Reading { reading } = event {
                assert_eq!(reading.co2, 650);
                break;
            }
        }

        transport.shutdown().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let transport = SyntheticTransport::new();
        transport.disconnect().await.unwrap();
        transport.disconnect().await.unwrap();
        transport.shutdown().await.unwrap();
    }
}
