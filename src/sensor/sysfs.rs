//! ev3dev `lego-sensor` class backend
//!
//! Every attached sensor shows up as `<root>/sensorN` with text attributes:
//!
//! ```text
//! sensor0/
//! ├── port_name    "in2"
//! ├── driver_name  "lego-ev3-ir"
//! ├── mode         "IR-PROX"
//! ├── modes        "IR-PROX IR-SEEK IR-REMOTE ..."
//! └── value0..3    "0"
//! ```

use super::backend::{parse_raw_value, ChannelReader, RemoteSensor};
use super::{InPort, SensorError, SensorMode, SensorType};
use crate::remote::Channel;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, info, warn};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/lego-sensor";

/// A sensor resolved to its sysfs directory
#[derive(Debug, Clone)]
pub struct SysfsSensor {
    path: PathBuf,
    sensor_type: SensorType,
    name: String,
}

impl SysfsSensor {
    /// Resolves the sensor of `sensor_type` attached to `port` below `root`
    pub async fn find(
        root: impl AsRef<Path>,
        port: InPort,
        sensor_type: SensorType,
    ) -> Result<Self, SensorError> {
        let root = root.as_ref();
        debug!("Scanning {} for {} sensor on {}", root.display(), sensor_type, port);

        let not_found = || SensorError::NotFound { sensor_type, port };

        let mut entries = match fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Unable to list {}: {}", root.display(), e);
                return Err(not_found());
            }
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SensorError::ReadError(e.to_string()))?
        {
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            if dir_name.starts_with("sensor") {
                candidates.push((dir_name, entry.path()));
            }
        }
        candidates.sort();

        for (dir_name, path) in candidates {
            let port_name = match read_attribute(&path, "port_name").await {
                Ok(value) => value,
                Err(e) => {
                    debug!("Skipping {}: {}", dir_name, e);
                    continue;
                }
            };
            if port_name != port.port_name() {
                continue;
            }

            let driver_name = read_attribute(&path, "driver_name").await?;
            if driver_name == sensor_type.driver_name() {
                info!("Found {} sensor on {} at {}", sensor_type, port, path.display());
                return Ok(Self {
                    name: format!("{} ({})", dir_name, port),
                    path,
                    sensor_type,
                });
            }
            debug!(
                "Port {} carries {} instead of {}",
                port,
                driver_name,
                sensor_type.driver_name()
            );
        }

        Err(not_found())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub async fn current_mode(&self) -> Result<String, SensorError> {
        read_attribute(&self.path, "mode").await
    }

    pub async fn available_modes(&self) -> Result<Vec<String>, SensorError> {
        let modes = read_attribute(&self.path, "modes").await?;
        Ok(modes.split_whitespace().map(str::to_string).collect())
    }
}

#[async_trait]
impl RemoteSensor for SysfsSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn set_mode(&self, mode: SensorMode) -> Result<(), SensorError> {
        if self.current_mode().await? == mode.mode_name() {
            debug!("{} already in {} mode", self.name, mode);
            return Ok(());
        }

        let modes = self.available_modes().await?;
        if !modes.iter().any(|m| m == mode.mode_name()) {
            return Err(SensorError::UnsupportedMode(format!(
                "{} does not offer {} (available: {})",
                self.name,
                mode,
                modes.join(" ")
            )));
        }

        let target = self.path.join("mode");
        fs::write(&target, mode.mode_name())
            .await
            .map_err(|e| SensorError::WriteError(format!("{}: {}", target.display(), e)))?;
        info!("Switched {} to {} mode", self.name, mode);
        Ok(())
    }

    async fn read_value(&self, index: usize) -> Result<u16, SensorError> {
        let raw = read_attribute(&self.path, &format!("value{}", index)).await?;
        parse_raw_value(&raw)
    }

    async fn open_channel(&self, channel: Channel) -> Result<Box<dyn ChannelReader>, SensorError> {
        let path = self.path.join(channel.value_attribute());
        let file = File::open(&path)
            .await
            .map_err(|e| SensorError::ReadError(format!("{}: {}", path.display(), e)))?;
        debug!("Opened {} for {}", path.display(), channel);
        Ok(Box::new(SysfsChannelReader {
            path,
            file,
            buffer: String::with_capacity(8),
        }))
    }
}

/// Keeps one `valueN` attribute open and re-reads it from the start
struct SysfsChannelReader {
    path: PathBuf,
    file: File,
    buffer: String,
}

#[async_trait]
impl ChannelReader for SysfsChannelReader {
    async fn read_raw(&mut self) -> Result<u16, SensorError> {
        self.buffer.clear();
        self.file
            .rewind()
            .await
            .map_err(|e| SensorError::ReadError(format!("{}: {}", self.path.display(), e)))?;
        self.file
            .read_to_string(&mut self.buffer)
            .await
            .map_err(|e| SensorError::ReadError(format!("{}: {}", self.path.display(), e)))?;
        parse_raw_value(&self.buffer)
    }
}

async fn read_attribute(path: &Path, attribute: &str) -> Result<String, SensorError> {
    let target = path.join(attribute);
    let value = fs::read_to_string(&target)
        .await
        .map_err(|e| SensorError::ReadError(format!("{}: {}", target.display(), e)))?;
    Ok(value.trim_matches(|c: char| c == ' ' || c == '\n').to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Lays out a fake `lego-sensor` directory for one sensor
    pub(crate) fn add_sensor(root: &Path, dir: &str, port: &str, driver: &str, modes: &str) {
        let path = root.join(dir);
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("port_name"), format!("{}\n", port)).unwrap();
        std::fs::write(path.join("driver_name"), format!("{}\n", driver)).unwrap();
        std::fs::write(path.join("modes"), format!("{}\n", modes)).unwrap();
        std::fs::write(path.join("mode"), "IR-PROX\n").unwrap();
        for index in 0..4 {
            std::fs::write(path.join(format!("value{}", index)), "0\n").unwrap();
        }
    }

    const IR_MODES: &str = "IR-PROX IR-SEEK IR-REMOTE IR-REM-A IR-CAL";

    #[tokio::test]
    async fn test_find_matches_port_and_driver() {
        let root = TempDir::new().unwrap();
        add_sensor(root.path(), "sensor0", "in1", "lego-ev3-color", "COL-REFLECT");
        add_sensor(root.path(), "sensor1", "in2", "lego-ev3-ir", IR_MODES);
        std::fs::create_dir_all(root.path().join("unrelated")).unwrap();

        let sensor = SysfsSensor::find(root.path(), InPort::In2, SensorType::Infrared)
            .await
            .unwrap();
        assert_eq!(sensor.path(), root.path().join("sensor1"));
        assert_eq!(sensor.name(), "sensor1 (in2)");
        assert_eq!(sensor.sensor_type(), SensorType::Infrared);
    }

    #[tokio::test]
    async fn test_find_reports_missing_sensor() {
        let root = TempDir::new().unwrap();
        add_sensor(root.path(), "sensor0", "in2", "lego-ev3-gyro", "GYRO-ANG");

        let err = SysfsSensor::find(root.path(), InPort::In2, SensorType::Infrared)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SensorError::NotFound {
                sensor_type: SensorType::Infrared,
                port: InPort::In2
            }
        ));
        assert_eq!(err.to_string(), "Could not find infrared sensor on port in2");

        let missing_root = root.path().join("does-not-exist");
        assert!(matches!(
            SysfsSensor::find(missing_root, InPort::In1, SensorType::Infrared).await,
            Err(SensorError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_mode_writes_once() {
        let root = TempDir::new().unwrap();
        add_sensor(root.path(), "sensor0", "in3", "lego-ev3-ir", IR_MODES);
        let sensor = SysfsSensor::find(root.path(), InPort::In3, SensorType::Infrared)
            .await
            .unwrap();

        sensor.set_mode(SensorMode::Remote).await.unwrap();
        assert_eq!(sensor.current_mode().await.unwrap(), "IR-REMOTE");

        // A second switch must not touch the attribute
        let mode_path = root.path().join("sensor0/mode");
        let before = std::fs::metadata(&mode_path).unwrap().modified().unwrap();
        std::fs::remove_file(root.path().join("sensor0/modes")).unwrap();
        sensor.set_mode(SensorMode::Remote).await.unwrap();
        let after = std::fs::metadata(&mode_path).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_set_mode_rejects_unknown_mode() {
        let root = TempDir::new().unwrap();
        add_sensor(root.path(), "sensor0", "in1", "lego-ev3-ir", "IR-PROX IR-SEEK");
        let sensor = SysfsSensor::find(root.path(), InPort::In1, SensorType::Infrared)
            .await
            .unwrap();

        assert!(matches!(
            sensor.set_mode(SensorMode::Remote).await,
            Err(SensorError::UnsupportedMode(_))
        ));
        assert_eq!(sensor.current_mode().await.unwrap(), "IR-PROX");
    }

    #[tokio::test]
    async fn test_channel_reader_rereads_attribute() {
        let root = TempDir::new().unwrap();
        add_sensor(root.path(), "sensor0", "in4", "lego-ev3-ir", IR_MODES);
        let sensor = SysfsSensor::find(root.path(), InPort::In4, SensorType::Infrared)
            .await
            .unwrap();
        let value_path = root.path().join("sensor0/value2");

        let mut reader = sensor.open_channel(Channel::Channel3).await.unwrap();
        assert_eq!(reader.read_raw().await.unwrap(), 0);

        std::fs::write(&value_path, "3\n").unwrap();
        assert_eq!(reader.read_raw().await.unwrap(), 3);
        assert_eq!(sensor.read_value(2).await.unwrap(), 3);

        std::fs::write(&value_path, "garbage\n").unwrap();
        assert!(matches!(
            reader.read_raw().await,
            Err(SensorError::ParseError(_))
        ));
    }
}
