//! Button events for the LEGO EV3 infrared remote
//!
//! ```rust,no_run
//! use ev3_remote::remote::SessionSettings;
//! use ev3_remote::sensor::{InPort, InfraredSensor};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sensor = InfraredSensor::find("/sys/class/lego-sensor", InPort::In2).await?;
//! let cancel = CancellationToken::new();
//!
//! let session = sensor
//!     .on_pressed(&cancel, SessionSettings::default(), |channel, button| {
//!         println!("{:?} pressed on {}", button, channel);
//!     })
//!     .await?;
//!
//! cancel.cancel();
//! session.join().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod remote;
pub mod sensor;
