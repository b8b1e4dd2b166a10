use super::{InPort, SensorType};

/// Errors raised while locating or talking to a sensor
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// No sensor of the requested type is attached to the port
    #[error("Could not find {sensor_type} sensor on port {port}")]
    NotFound {
        sensor_type: SensorType,
        port: InPort,
    },

    /// The driver does not list the requested mode
    #[error("Unsupported sensor mode: {0}")]
    UnsupportedMode(String),

    /// An attribute could not be read
    #[error("Failed to read sensor attribute: {0}")]
    ReadError(String),

    /// An attribute could not be written
    #[error("Failed to write sensor attribute: {0}")]
    WriteError(String),

    /// A raw value is not an integer of the expected width
    #[error("Malformed sensor value: {0}")]
    ParseError(String),
}
