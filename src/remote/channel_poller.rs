use crate::remote::signal::{Channel, RawSample};
use crate::sensor::{RemoteSensor, SensorError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Samples one remote channel at a fixed interval
///
/// Every reading is forwarded, including repeated and zero values; turning
/// them into edges is the aggregator's job. The channel reader is opened when
/// the poller starts and dropped on every exit path.
pub struct ChannelPoller {
    channel: Channel,
    sensor: Arc<dyn RemoteSensor>,
    poll_interval: Duration,
    sample_sender: mpsc::Sender<RawSample>,
}

impl ChannelPoller {
    pub fn new(
        channel: Channel,
        sensor: Arc<dyn RemoteSensor>,
        poll_interval: Duration,
        sample_sender: mpsc::Sender<RawSample>,
    ) -> Self {
        Self {
            channel,
            sensor,
            poll_interval,
            sample_sender,
        }
    }

    /// Polls until `token` is cancelled or the sample stream is closed
    ///
    /// A failed or malformed read ends the poller with an error; there are no
    /// retries.
    pub async fn run(self, token: CancellationToken) -> Result<(), SensorError> {
        let mut reader = match self.sensor.open_channel(self.channel).await {
            Ok(reader) => reader,
            Err(e) => {
                error!("Failed to open {} on {}: {}", self.channel, self.sensor.name(), e);
                return Err(e);
            }
        };

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sample_count: u64 = 0;

        info!(
            "Polling {} on {} every {}ms",
            self.channel,
            self.sensor.name(),
            self.poll_interval.as_millis()
        );

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let value = match reader.read_raw().await {
                Ok(value) => value,
                Err(e) => {
                    error!("Read of {} failed after {} samples: {}", self.channel, sample_count, e);
                    return Err(e);
                }
            };

            let sample = RawSample::new(self.channel, value);
            debug!(
                "Sampled {} = {} at {}",
                sample.channel,
                sample.value,
                sample.timestamp.format("%H:%M:%S.%3f")
            );

            // Blocks while the stream is full
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent = self.sample_sender.send(sample) => {
                    if sent.is_err() {
                        debug!("Sample stream closed, stopping {} poller", self.channel);
                        break;
                    }
                }
            }
            sample_count += 1;
        }

        info!("{} poller stopped after {} samples", self.channel, sample_count);
        Ok(())
    }
}
