//! Infrared sensor API
//!
//! Proximity readings and remote control sessions share one sensor; each
//! call switches the sensor into the mode it needs. Reading the proximity
//! while a remote session is listening therefore disturbs that session.

use super::{InPort, RemoteSensor, SensorError, SensorMode, SensorType, SysfsSensor};
use crate::remote::{Button, Channel, EdgeKind, RemoteError, SessionHandle, SessionSettings};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Proximity below which an object counts as "near"
pub const NEAR_THRESHOLD: u8 = 20;

const PROXIMITY_CONFIRM_DELAY: Duration = Duration::from_millis(100);

pub struct InfraredSensor {
    sensor: Arc<dyn RemoteSensor>,
}

impl InfraredSensor {
    /// Locates the infrared sensor attached to `port` below the sysfs `root`
    pub async fn find(root: impl AsRef<Path>, port: InPort) -> Result<Self, SensorError> {
        let sensor = SysfsSensor::find(root, port, SensorType::Infrared).await?;
        Ok(Self::new(Arc::new(sensor)))
    }

    pub fn new(sensor: Arc<dyn RemoteSensor>) -> Self {
        Self { sensor }
    }

    pub fn name(&self) -> &str {
        self.sensor.name()
    }

    pub async fn remote_mode_on(&self) -> Result<(), SensorError> {
        self.sensor.set_mode(SensorMode::Remote).await
    }

    /// Reads the proximity value in the range 0-100
    ///
    /// A value of 100 corresponds to roughly 70 cm.
    pub async fn read_proximity(&self) -> Result<u8, SensorError> {
        self.sensor.set_mode(SensorMode::Proximity).await?;
        let value = self.sensor.read_value(0).await?;
        u8::try_from(value)
            .map_err(|_| SensorError::ParseError(format!("proximity {} out of range", value)))
    }

    /// Waits until two readings taken 100 ms apart both report a nearby object
    ///
    /// Returns `false` when `cancel` fires first.
    pub async fn wait_for_proximity(&self, cancel: &CancellationToken) -> Result<bool, SensorError> {
        info!("Waiting for an object near {}", self.name());
        loop {
            if cancel.is_cancelled() {
                return Ok(false);
            }
            let first = self.read_proximity().await?;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(false),
                _ = tokio::time::sleep(PROXIMITY_CONFIRM_DELAY) => {}
            }

            let second = self.read_proximity().await?;
            debug!("Proximity readings: {} / {}", first, second);
            if first < NEAR_THRESHOLD && second < NEAR_THRESHOLD {
                info!("Object detected near {}", self.name());
                return Ok(true);
            }
        }
    }

    /// Calls `callback` once for every button that gets pressed
    ///
    /// Listening continues in the background until `cancel` fires or a read
    /// fails; the returned handle reports which of the two happened.
    pub async fn on_pressed<F>(
        &self,
        cancel: &CancellationToken,
        settings: SessionSettings,
        callback: F,
    ) -> Result<SessionHandle, RemoteError>
    where
        F: Fn(Channel, Button) + Send + Sync + 'static,
    {
        SessionHandle::spawn(
            EdgeKind::Press,
            self.sensor.clone(),
            settings,
            cancel,
            Arc::new(callback),
        )
        .await
    }

    /// Calls `callback` once for every held button when its channel goes idle
    pub async fn on_released<F>(
        &self,
        cancel: &CancellationToken,
        settings: SessionSettings,
        callback: F,
    ) -> Result<SessionHandle, RemoteError>
    where
        F: Fn(Channel, Button) + Send + Sync + 'static,
    {
        SessionHandle::spawn(
            EdgeKind::Release,
            self.sensor.clone(),
            settings,
            cancel,
            Arc::new(callback),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::sysfs::tests::add_sensor;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const IR_MODES: &str = "IR-PROX IR-SEEK IR-REMOTE";

    async fn sensor_in(root: &TempDir) -> InfraredSensor {
        add_sensor(root.path(), "sensor3", "in2", "lego-ev3-ir", IR_MODES);
        InfraredSensor::find(root.path(), InPort::In2).await.unwrap()
    }

    #[tokio::test]
    async fn test_read_proximity_switches_mode() {
        let root = TempDir::new().unwrap();
        let sensor = sensor_in(&root).await;
        let dir = root.path().join("sensor3");
        std::fs::write(dir.join("mode"), "IR-REMOTE\n").unwrap();
        std::fs::write(dir.join("value0"), "42\n").unwrap();

        assert_eq!(sensor.read_proximity().await.unwrap(), 42);
        assert_eq!(std::fs::read_to_string(dir.join("mode")).unwrap(), "IR-PROX");

        std::fs::write(dir.join("value0"), "300\n").unwrap();
        assert!(matches!(
            sensor.read_proximity().await,
            Err(SensorError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn test_wait_for_proximity_detects_near_object() {
        let root = TempDir::new().unwrap();
        let sensor = sensor_in(&root).await;
        std::fs::write(root.path().join("sensor3/value0"), "12\n").unwrap();

        let cancel = CancellationToken::new();
        assert!(sensor.wait_for_proximity(&cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_proximity_honours_cancellation() {
        let root = TempDir::new().unwrap();
        let sensor = sensor_in(&root).await;
        std::fs::write(root.path().join("sensor3/value0"), "80\n").unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            trigger.cancel();
        });

        assert!(!sensor.wait_for_proximity(&cancel).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_fails_without_infrared_sensor() {
        let root = TempDir::new().unwrap();
        add_sensor(root.path(), "sensor0", "in2", "lego-ev3-touch", "TOUCH");

        assert!(matches!(
            InfraredSensor::find(root.path(), InPort::In2).await,
            Err(SensorError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_on_pressed_over_sysfs() {
        let root = TempDir::new().unwrap();
        let sensor = sensor_in(&root).await;
        let dir = root.path().join("sensor3");

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let cancel = CancellationToken::new();
        let settings = SessionSettings {
            poll_interval: Duration::from_millis(10),
            ..SessionSettings::default()
        };

        // Held for the whole session
        std::fs::write(dir.join("value1"), "2\n").unwrap();

        let session = sensor
            .on_pressed(&cancel, settings, move |channel, button| {
                sink.lock().unwrap().push((channel, button));
            })
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("mode")).unwrap(), "IR-REMOTE");

        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
        session.join().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![(Channel::Channel2, Button::RedDown)]
        );
    }

    #[tokio::test]
    async fn test_on_released_reports_malformed_values() {
        let root = TempDir::new().unwrap();
        let sensor = sensor_in(&root).await;
        let settings = SessionSettings {
            poll_interval: Duration::from_millis(10),
            ..SessionSettings::default()
        };
        let cancel = CancellationToken::new();
        std::fs::write(root.path().join("sensor3/value3"), "not-a-number\n").unwrap();

        let session = sensor
            .on_released(&cancel, settings, |_, _| {})
            .await
            .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), session.join())
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteError::SensorError(SensorError::ParseError(_))
        ));
        assert!(!cancel.is_cancelled());
    }
}
