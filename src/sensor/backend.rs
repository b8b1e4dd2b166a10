use super::{SensorError, SensorMode};
use crate::remote::Channel;
use async_trait::async_trait;

/// Capabilities the remote pipeline needs from a sensor driver
#[async_trait]
pub trait RemoteSensor: Send + Sync {
    /// Human readable identifier used in logs
    fn name(&self) -> &str;

    /// Switches the operating mode; a no-op when already in `mode`
    async fn set_mode(&self, mode: SensorMode) -> Result<(), SensorError>;

    /// Point read of `value{index}`
    async fn read_value(&self, index: usize) -> Result<u16, SensorError>;

    /// Opens a reader bound to one channel. The reader holds the underlying
    /// resource until it is dropped.
    async fn open_channel(&self, channel: Channel) -> Result<Box<dyn ChannelReader>, SensorError>;
}

/// Repeated reads of a single channel
#[async_trait]
pub trait ChannelReader: Send {
    async fn read_raw(&mut self) -> Result<u16, SensorError>;
}

/// Parses a driver value as written by the kernel (`"3\n"`)
pub fn parse_raw_value(data: &str) -> Result<u16, SensorError> {
    let trimmed = data.trim_matches(|c: char| c == ' ' || c == '\n');
    trimmed
        .parse::<u16>()
        .map_err(|e| SensorError::ParseError(format!("{:?}: {}", trimmed, e)))
}
