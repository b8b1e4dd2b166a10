//! Session Handle - lifecycle of one press or release listening session
//!
//! A session owns four channel pollers and one aggregator, all running as
//! tokio tasks inside a single [`JoinSet`]. The supervisor task drains that
//! set; the first failing task cancels the session token so every sibling
//! stops, and its error is reported through [`SessionHandle::join`].
//!
//! # State Machine
//!
//! ```text
//! Configured ──start──► Listening ──supervise──► (all tasks joined)
//!   (settings,            (mode switched,
//!    child token)          tasks spawned)
//! ```

use crate::remote::channel_poller::ChannelPoller;
use crate::remote::event_aggregator::{
    ButtonCallback, EdgeDetector, EdgeKind, EventAggregator, PressDetector, ReleaseDetector,
};
use crate::remote::signal::{Channel, RawSample};
use crate::sensor::{RemoteSensor, SensorError, SensorMode};
use statum::{machine, state};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_STREAM_CAPACITY: usize = 50;

/// Per-session tuning
///
/// # Examples
///
/// ```rust
/// use ev3_remote::remote::SessionSettings;
/// use std::time::Duration;
///
/// let snappy = SessionSettings {
///     poll_interval: Duration::from_millis(100),
///     ..SessionSettings::default()
/// };
/// assert_eq!(snappy.stream_capacity, 50);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    /// Delay between two reads of the same channel
    pub poll_interval: Duration,

    /// Samples buffered between the pollers and the aggregator before the
    /// pollers have to wait
    pub stream_capacity: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<(), RemoteError> {
        if self.poll_interval.is_zero() {
            return Err(RemoteError::InvalidSettings(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.stream_capacity == 0 {
            return Err(RemoteError::InvalidSettings(
                "stream capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that end a session or prevent it from starting
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Sensor lookup, mode switch or channel read failed
    #[error("Sensor error: {0}")]
    SensorError(#[from] SensorError),

    #[error("Invalid session settings: {0}")]
    InvalidSettings(String),

    /// A session task panicked or was aborted
    #[error("Session task error: {0}")]
    TaskError(String),
}

#[state]
#[derive(Debug, Clone)]
pub enum SessionState {
    Configured, // Settings validated, nothing running
    Listening,  // Pollers and aggregator spawned
}

#[machine]
pub struct RemoteSession<S: SessionState> {
    kind: EdgeKind,
    sensor: Arc<dyn RemoteSensor>,
    settings: SessionSettings,
    token: CancellationToken,
    tasks: JoinSet<Result<(), RemoteError>>,
}

impl<S: SessionState> RemoteSession<S> {
    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl RemoteSession<Configured> {
    /// Prepares a session whose token is a child of `parent`
    pub fn create(
        kind: EdgeKind,
        sensor: Arc<dyn RemoteSensor>,
        settings: SessionSettings,
        parent: &CancellationToken,
    ) -> Result<Self, RemoteError> {
        settings.validate()?;
        debug!("Creating {} session on {} with {:?}", kind, sensor.name(), settings);

        Ok(Self::new(
            kind,
            sensor,
            settings,
            parent.child_token(),
            JoinSet::new(),
        ))
    }

    /// Switches the sensor to remote mode and spawns the session tasks
    ///
    /// Nothing is spawned if the mode switch fails.
    pub async fn start(
        mut self,
        callback: ButtonCallback,
    ) -> Result<RemoteSession<Listening>, RemoteError> {
        info!("Starting {} session on {}", self.kind, self.sensor.name());
        self.sensor.set_mode(SensorMode::Remote).await?;

        let (sample_sender, sample_receiver) =
            mpsc::channel::<RawSample>(self.settings.stream_capacity);
        debug!(
            "Created sample stream with capacity {}",
            self.settings.stream_capacity
        );

        for channel in Channel::ALL {
            let poller = ChannelPoller::new(
                channel,
                self.sensor.clone(),
                self.settings.poll_interval,
                sample_sender.clone(),
            );
            let token = self.token.clone();
            self.tasks
                .spawn(async move { poller.run(token).await.map_err(RemoteError::from) });
        }
        // The aggregator sees the stream close once every poller is gone
        drop(sample_sender);

        match self.kind {
            EdgeKind::Press => {
                self.spawn_aggregator(PressDetector::new(), sample_receiver, callback)
            }
            EdgeKind::Release => {
                self.spawn_aggregator(ReleaseDetector::new(), sample_receiver, callback)
            }
        }

        info!("{} session listening on {}", self.kind, self.sensor.name());
        Ok(self.transition())
    }

    fn spawn_aggregator<D: EdgeDetector + 'static>(
        &mut self,
        detector: D,
        sample_receiver: mpsc::Receiver<RawSample>,
        callback: ButtonCallback,
    ) {
        let aggregator = EventAggregator::new(detector, sample_receiver, callback);
        let token = self.token.clone();
        self.tasks.spawn(async move {
            aggregator.run(token).await;
            Ok(())
        });
    }
}

impl RemoteSession<Listening> {
    /// Waits for every task of the session
    ///
    /// The first failure cancels the session token and is returned once all
    /// siblings have stopped.
    pub async fn supervise(mut self) -> Result<(), RemoteError> {
        let mut first_error: Option<RemoteError> = None;

        while let Some(joined) = self.tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(RemoteError::TaskError(e.to_string())));
            if let Err(e) = result {
                error!("{} session task failed: {}", self.kind, e);
                self.token.cancel();
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!("Suppressing follow-up error in {} session", self.kind);
                }
            }
        }

        match first_error {
            Some(e) => {
                error!("{} session on {} terminated", self.kind, self.sensor.name());
                Err(e)
            }
            None => {
                info!("{} session on {} stopped", self.kind, self.sensor.name());
                Ok(())
            }
        }
    }
}

/// Handle to a running session
///
/// Dropping the handle leaves the session running until its cancellation
/// token fires.
#[derive(Debug)]
pub struct SessionHandle {
    kind: EdgeKind,
    token: CancellationToken,
    supervisor: JoinHandle<Result<(), RemoteError>>,
}

impl SessionHandle {
    /// Starts a session and returns once its tasks are spawned
    pub async fn spawn(
        kind: EdgeKind,
        sensor: Arc<dyn RemoteSensor>,
        settings: SessionSettings,
        cancel: &CancellationToken,
        callback: ButtonCallback,
    ) -> Result<Self, RemoteError> {
        let session = RemoteSession::create(kind, sensor, settings, cancel)?;
        let token = session.token();
        let listening = session.start(callback).await?;
        let supervisor = tokio::spawn(listening.supervise());

        Ok(Self {
            kind,
            token,
            supervisor,
        })
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Token of this session; cancelling it stops only this session
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Waits until the session ends by cancellation or failure
    pub async fn join(self) -> Result<(), RemoteError> {
        match self.supervisor.await {
            Ok(result) => result,
            Err(e) => {
                error!("{} session supervisor panicked: {}", self.kind, e);
                Err(RemoteError::TaskError(e.to_string()))
            }
        }
    }

    /// Cancels the session and waits for all of its tasks
    pub async fn stop(self) -> Result<(), RemoteError> {
        debug!("Stopping {} session", self.kind);
        self.token.cancel();
        self.join().await
    }
}
