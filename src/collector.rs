//! Async [`Collector`] driver.
//!
//! Owns a [`Coordinator`] behind a tokio mutex and ticks it on a fixed
//! interval from a background task. With the UDP link, a second task runs
//! the receive loop and feeds the coordinator's [`RxHandler`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::coordinator::{Coordinator, CoordinatorConfig, State};
use crate::error::{Error, Result};
use crate::event::RxHandler;
use crate::link::{Link, UdpConfig, UdpLink};
use crate::types::{DeviceView, SensorSummary};

/// Default period between coordinator steps.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(5);

fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Runs a coordinator in the background.
pub struct Collector<L> {
    coordinator: Arc<Mutex<Coordinator<L>>>,
    tick_interval: Duration,

    // Background tasks
    rx_task: Option<JoinHandle<()>>,
    tick_task: Option<JoinHandle<()>>,
}

impl Collector<UdpLink> {
    /// Binds a UDP link and starts collecting.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the socket
    /// cannot be bound.
    pub async fn udp(udp: &UdpConfig, config: CoordinatorConfig) -> Result<Self> {
        let (link, receiver) = UdpLink::bind(udp).await?;
        let (mut collector, mut handler) = Self::new(link, config)?;

        let rx_task = tokio::spawn(async move {
            if let Err(e) = receiver
                .run(move |source, frame| handler.on_receive(source, frame))
                .await
            {
                tracing::error!("receive loop error: {}", e);
            }
        });
        collector.rx_task = Some(rx_task);

        collector.start()?;
        Ok(collector)
    }
}

impl<L: Link + 'static> Collector<L> {
    /// Creates a stopped collector over `link`.
    ///
    /// The returned handler must be fed every frame the link receives.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the configuration is inconsistent.
    pub fn new(link: L, config: CoordinatorConfig) -> Result<(Self, RxHandler)> {
        let (coordinator, handler) = Coordinator::new(config, link)?;
        Ok((Self::from_coordinator(coordinator), handler))
    }

    /// Wraps an already configured coordinator.
    #[must_use]
    pub fn from_coordinator(coordinator: Coordinator<L>) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            tick_interval: DEFAULT_TICK_INTERVAL,
            rx_task: None,
            tick_task: None,
        }
    }

    /// Sets the period between coordinator steps. Takes effect on the next
    /// [`start`](Self::start).
    #[must_use]
    pub const fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Starts the tick task.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyStarted` if the task is running.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(Error::AlreadyStarted);
        }

        let coordinator = Arc::clone(&self.coordinator);
        let period = self.tick_interval;
        tracing::debug!("starting coordinator loop every {:?}", period);

        let tick_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                coordinator.lock().await.tick(now());
            }
        });
        self.tick_task = Some(tick_task);
        Ok(())
    }

    /// Returns true while the tick task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tick_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Shared handle to the coordinator.
    #[must_use]
    pub fn coordinator(&self) -> Arc<Mutex<Coordinator<L>>> {
        Arc::clone(&self.coordinator)
    }

    /// Current coordinator state.
    pub async fn state(&self) -> State {
        self.coordinator.lock().await.state()
    }

    /// Summary rows for every id in range.
    pub async fn summary(&self) -> Vec<SensorSummary> {
        self.coordinator.lock().await.summary(now())
    }

    /// Measurement view of one device.
    pub async fn device(&self, id: u8) -> Option<DeviceView> {
        self.coordinator.lock().await.device_view(id, now())
    }
}

impl<L> Collector<L> {
    /// Stops all background tasks.
    pub fn stop(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
        if let Some(task) = self.rx_task.take() {
            task.abort();
        }
    }
}

impl<L> Drop for Collector<L> {
    fn drop(&mut self) {
        self.stop();
    }
}
