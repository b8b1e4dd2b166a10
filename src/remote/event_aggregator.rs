use crate::remote::signal::{Button, ButtonKey, Channel, PressedSet, RawSample, Reading};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// User callback invoked once per detected edge
pub type ButtonCallback = Arc<dyn Fn(Channel, Button) + Send + Sync>;

// Which transition a session reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Press,
    Release,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Press => f.write_str("press"),
            EdgeKind::Release => f.write_str("release"),
        }
    }
}

/// Turns raw samples into button edges
pub trait EdgeDetector: Send {
    fn kind(&self) -> EdgeKind;

    /// Updates state with one sample and returns the keys whose edge fired
    fn observe(&mut self, sample: &RawSample) -> Vec<ButtonKey>;
}

/// Reports a button the first time it shows up on its channel
///
/// An idle reading forgets everything pressed on that channel without
/// reporting it, so the next non-zero reading counts as a fresh press.
#[derive(Debug, Default)]
pub struct PressDetector {
    pressed: PressedSet,
}

impl PressDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EdgeDetector for PressDetector {
    fn kind(&self) -> EdgeKind {
        EdgeKind::Press
    }

    fn observe(&mut self, sample: &RawSample) -> Vec<ButtonKey> {
        match sample.reading() {
            Reading::Idle => {
                self.pressed.clear_channel(sample.channel);
                Vec::new()
            }
            Reading::Button(button) => {
                let key = ButtonKey::new(sample.channel, button);
                if self.pressed.set(key) {
                    vec![key]
                } else {
                    Vec::new()
                }
            }
            Reading::Unknown(code) => {
                debug!("Ignoring unknown code {} on {}", code, sample.channel);
                Vec::new()
            }
        }
    }
}

/// Reports every held button of a channel once the channel goes idle
#[derive(Debug, Default)]
pub struct ReleaseDetector {
    held: PressedSet,
}

impl ReleaseDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EdgeDetector for ReleaseDetector {
    fn kind(&self) -> EdgeKind {
        EdgeKind::Release
    }

    fn observe(&mut self, sample: &RawSample) -> Vec<ButtonKey> {
        match sample.reading() {
            Reading::Button(button) => {
                self.held.set(ButtonKey::new(sample.channel, button));
                Vec::new()
            }
            Reading::Idle => Button::ALL
                .iter()
                .map(|button| ButtonKey::new(sample.channel, *button))
                .filter(|key| self.held.clear(*key))
                .collect(),
            Reading::Unknown(code) => {
                debug!("Ignoring unknown code {} on {}", code, sample.channel);
                Vec::new()
            }
        }
    }
}

/// Consumes the merged sample stream of one session and drives the callback
pub struct EventAggregator<D: EdgeDetector> {
    detector: D,
    sample_receiver: mpsc::Receiver<RawSample>,
    callback: ButtonCallback,
}

impl<D: EdgeDetector> EventAggregator<D> {
    pub fn new(
        detector: D,
        sample_receiver: mpsc::Receiver<RawSample>,
        callback: ButtonCallback,
    ) -> Self {
        Self {
            detector,
            sample_receiver,
            callback,
        }
    }

    /// Runs until `token` is cancelled or every poller has hung up
    ///
    /// The token is checked before each callback: once cancellation is seen,
    /// no further callback starts and buffered samples are dropped.
    pub async fn run(mut self, token: CancellationToken) -> u64 {
        let kind = self.detector.kind();
        let mut fired: u64 = 0;
        info!("Starting {} aggregator", kind);

        'samples: loop {
            let sample = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sample = self.sample_receiver.recv() => match sample {
                    Some(sample) => sample,
                    None => {
                        debug!("All pollers hung up, stopping {} aggregator", kind);
                        break;
                    }
                },
            };

            for key in self.detector.observe(&sample) {
                if token.is_cancelled() {
                    debug!("Dropping {} of {} after cancellation", kind, key);
                    break 'samples;
                }
                info!(
                    "Remote {}: {} at {}",
                    kind,
                    key,
                    sample.timestamp.format("%H:%M:%S.%3f")
                );
                (self.callback)(key.channel, key.button);
                fired += 1;
            }
        }

        info!("{} aggregator stopped after {} events", kind, fired);
        fired
    }
}
