//! EV3 sensor access
//!
//! The remote pipeline only talks to a sensor through the [`backend`] traits:
//!
//! 1. [`backend::RemoteSensor`] - mode selection and point reads
//! 2. [`backend::ChannelReader`] - a per-channel handle owned by one poller
//!
//! [`sysfs::SysfsSensor`] implements them on top of the ev3dev
//! `lego-sensor` class, [`infrared::InfraredSensor`] is the user-facing API.
//!
//! ```text
//! /sys/class/lego-sensor/sensorN ──► SysfsSensor ──► InfraredSensor ──► sessions
//!      (mode, modes, value0..3)       (backend)        (proximity, remote)
//! ```

pub mod backend;
pub mod error;
pub mod infrared;
pub mod sysfs;

pub use backend::{ChannelReader, RemoteSensor};
pub use error::SensorError;
pub use infrared::InfraredSensor;
pub use sysfs::SysfsSensor;

use serde::{Deserialize, Serialize};
use std::fmt;

// Input ports of the brick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InPort {
    In1,
    In2,
    In3,
    In4,
}

impl InPort {
    /// Name reported in the driver's `port_name` attribute
    pub fn port_name(self) -> &'static str {
        match self {
            InPort::In1 => "in1",
            InPort::In2 => "in2",
            InPort::In3 => "in3",
            InPort::In4 => "in4",
        }
    }
}

impl fmt::Display for InPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.port_name())
    }
}

/// Sensor kinds, identified by their `driver_name`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    Touch,
    Color,
    Ultrasonic,
    Infrared,
    Gyro,
}

impl SensorType {
    pub fn driver_name(self) -> &'static str {
        match self {
            SensorType::Touch => "lego-ev3-touch",
            SensorType::Color => "lego-ev3-color",
            SensorType::Ultrasonic => "lego-ev3-us",
            SensorType::Infrared => "lego-ev3-ir",
            SensorType::Gyro => "lego-ev3-gyro",
        }
    }

    pub fn from_driver_name(name: &str) -> Option<Self> {
        match name {
            "lego-ev3-touch" => Some(SensorType::Touch),
            "lego-ev3-color" => Some(SensorType::Color),
            "lego-ev3-us" => Some(SensorType::Ultrasonic),
            "lego-ev3-ir" => Some(SensorType::Infrared),
            "lego-ev3-gyro" => Some(SensorType::Gyro),
            _ => None,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorType::Touch => "touch",
            SensorType::Color => "color",
            SensorType::Ultrasonic => "ultrasonic",
            SensorType::Infrared => "infrared",
            SensorType::Gyro => "gyro",
        };
        f.write_str(name)
    }
}

// Operating modes of the infrared sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorMode {
    Proximity,
    Remote,
}

impl SensorMode {
    pub fn mode_name(self) -> &'static str {
        match self {
            SensorMode::Proximity => "IR-PROX",
            SensorMode::Remote => "IR-REMOTE",
        }
    }
}

impl fmt::Display for SensorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode_name())
    }
}
