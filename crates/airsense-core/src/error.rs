//! Error types for airsense-core.
//!
//! This module defines all error types that can occur while connecting to
//! AirSense devices, streaming readings, and persisting application state.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in airsense-core.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available on this host.
    #[error("Bluetooth unavailable: {0}")]
    BluetoothUnavailable(String),

    /// A scan is already running.
    #[error("Scan already in progress")]
    ScanInProgress,

    /// A connection attempt is already running.
    #[error("Connection attempt already in progress")]
    ConnectInProgress,

    /// Device not found during scan or connection.
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceNotFoundReason),

    /// Operation attempted while not connected to a device.
    #[error("Not connected to device")]
    NotConnected,

    /// Required BLE characteristic not found on the device.
    #[error("Characteristic not found: {uuid} (searched {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// Connection failed with a specific reason.
    #[error("Connection failed: {reason}")]
    ConnectionFailed {
        /// The device identifier that failed to connect.
        device_id: Option<String>,
        /// The structured reason for the failure.
        reason: ConnectionFailureReason,
    },

    /// Failed to parse data received from the device.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Notification payload had the wrong size.
    #[error("Invalid notification payload: expected {expected} bytes, got {actual}")]
    InvalidPayload {
        /// Expected payload size.
        expected: usize,
        /// Actual payload size received.
        actual: usize,
    },

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error from the persistence layer.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No suitable location for persisted data.
    #[error("No storage directory available: {0}")]
    NoStorageDir(String),
}

/// Structured reasons for connection failures.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// Bluetooth adapter not available or powered off.
    AdapterUnavailable,
    /// Device is out of range.
    OutOfRange,
    /// Device rejected the connection.
    Rejected,
    /// Connection attempt timed out.
    Timeout,
    /// Required GATT service missing after discovery.
    ServiceMissing(String),
    /// Generic BLE error.
    BleError(String),
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdapterUnavailable => write!(f, "Bluetooth adapter unavailable"),
            Self::OutOfRange => write!(f, "device out of range"),
            Self::Rejected => write!(f, "connection rejected by device"),
            Self::Timeout => write!(f, "connection timed out"),
            Self::ServiceMissing(uuid) => write!(f, "required service {} missing", uuid),
            Self::BleError(msg) => write!(f, "BLE error: {}", msg),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Reason why a device was not found.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum DeviceNotFoundReason {
    /// No devices found during scan.
    NoDevicesInRange,
    /// Device with the specified identifier not found.
    NotFound { identifier: String },
    /// Scan timed out before finding the device.
    ScanTimeout { duration: Duration },
    /// No Bluetooth adapter available.
    NoAdapter,
}

impl std::fmt::Display for DeviceNotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDevicesInRange => write!(f, "no devices in range"),
            Self::NotFound { identifier } => write!(f, "device '{}' not found", identifier),
            Self::ScanTimeout { duration } => write!(f, "scan timed out after {:?}", duration),
            Self::NoAdapter => write!(f, "no Bluetooth adapter available"),
        }
    }
}

impl Error {
    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(DeviceNotFoundReason::NotFound {
            identifier: identifier.into(),
        })
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a connection failure with structured reason.
    pub fn connection_failed(device_id: Option<String>, reason: ConnectionFailureReason) -> Self {
        Self::ConnectionFailed { device_id, reason }
    }

    /// Whether this error means another exclusive operation is running.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::ScanInProgress | Self::ConnectInProgress)
    }
}

impl From<airsense_types::ParseError> for Error {
    fn from(err: airsense_types::ParseError) -> Self {
        match err {
            airsense_types::ParseError::InsufficientBytes { expected, actual } => {
                Error::InvalidPayload { expected, actual }
            }
            airsense_types::ParseError::InvalidValue(msg) => Error::InvalidData(msg),
            // Handle future ParseError variants (non_exhaustive)
            _ => Error::InvalidData(format!("Parse error: {}", err)),
        }
    }
}

/// Result type alias using airsense-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::device_not_found("AirSense 1234");
        assert!(err.to_string().contains("AirSense 1234"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to device");

        let err = Error::characteristic_not_found("0x2B8C", 3);
        assert!(err.to_string().contains("0x2B8C"));
        assert!(err.to_string().contains("3 services"));

        let err = Error::timeout("scan", Duration::from_secs(10));
        assert!(err.to_string().contains("scan"));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_busy_errors() {
        assert!(Error::ScanInProgress.is_busy());
        assert!(Error::ConnectInProgress.is_busy());
        assert!(!Error::NotConnected.is_busy());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = airsense_types::ParseError::InsufficientBytes {
            expected: 2,
            actual: 1,
        }
        .into();
        assert!(matches!(
            err,
            Error::InvalidPayload {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_connection_failure_display() {
        let err = Error::connection_failed(
            Some("demo".to_string()),
            ConnectionFailureReason::ServiceMissing("181a".to_string()),
        );
        assert!(err.to_string().contains("required service 181a missing"));
    }
}
