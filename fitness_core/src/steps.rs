//! Pedometer abstraction and daily step tracking.
//!
//! A [`Pedometer`] answers three questions: is a sensor present, how many
//! steps were counted in an interval, and what is the live count since a
//! subscription began. [`StepTracker`] combines the first two into today's
//! total and feeds it into the store.
//!
//! Subscriptions are scoped: dropping a [`StepSubscription`] unregisters it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use crate::api::WorkoutApi;
use crate::report::DATE_FORMAT;
use crate::store::WorkoutStore;
use crate::{Error, Result};

/// Step sensor as seen by the tracker
#[async_trait]
pub trait Pedometer: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Steps counted between `start` and `end` (inclusive)
    async fn step_count(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<u64>;

    /// Live cumulative count since the returned subscription was created
    fn watch_step_count(&self) -> Result<StepSubscription>;
}

/// Handle to a live step stream.
///
/// Each item is the cumulative step count since the subscription began.
/// The listener is released when the handle is dropped.
pub struct StepSubscription {
    receiver: mpsc::UnboundedReceiver<u64>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl StepSubscription {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<u64>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Next cumulative count, or `None` once the sensor stops reporting
    pub async fn next(&mut self) -> Option<u64> {
        self.receiver.recv().await
    }
}

impl Drop for StepSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

// ============================================================================
// Pedometers
// ============================================================================

/// Pedometer for hosts without a step sensor
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePedometer;

#[async_trait]
impl Pedometer for UnavailablePedometer {
    async fn is_available(&self) -> bool {
        false
    }

    async fn step_count(&self, _start: DateTime<Local>, _end: DateTime<Local>) -> Result<u64> {
        Err(Error::Other("Pedometer not available".into()))
    }

    fn watch_step_count(&self) -> Result<StepSubscription> {
        Err(Error::Other("Pedometer not available".into()))
    }
}

struct Listener {
    id: u64,
    total: u64,
    sender: mpsc::UnboundedSender<u64>,
}

#[derive(Default)]
struct ChannelInner {
    samples: Vec<(DateTime<Local>, u64)>,
    listeners: Vec<Listener>,
    next_id: u64,
    closed: bool,
}

/// In-process pedometer fed by whoever owns the real sensor.
///
/// Every [`record`](Self::record) call is stored as a timestamped sample for
/// interval queries and pushed to each live subscription.
#[derive(Clone, Default)]
pub struct ChannelPedometer {
    inner: Arc<Mutex<ChannelInner>>,
}

fn lock(inner: &Mutex<ChannelInner>) -> MutexGuard<'_, ChannelInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChannelPedometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `steps` taken now
    pub fn record(&self, steps: u64) {
        self.record_at(Local::now(), steps);
    }

    /// Record `steps` taken at `at`
    pub fn record_at(&self, at: DateTime<Local>, steps: u64) {
        let mut inner = lock(&self.inner);
        if inner.closed {
            tracing::debug!("Ignoring {} steps recorded after close", steps);
            return;
        }
        inner.samples.push((at, steps));
        inner.listeners.retain_mut(|listener| {
            listener.total += steps;
            listener.sender.send(listener.total).is_ok()
        });
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Stop reporting. Live subscriptions end and new ones are refused.
    pub fn close(&self) {
        let mut inner = lock(&self.inner);
        inner.closed = true;
        inner.listeners.clear();
    }
}

#[async_trait]
impl Pedometer for ChannelPedometer {
    async fn is_available(&self) -> bool {
        !lock(&self.inner).closed
    }

    async fn step_count(&self, start: DateTime<Local>, end: DateTime<Local>) -> Result<u64> {
        let inner = lock(&self.inner);
        Ok(inner
            .samples
            .iter()
            .filter(|(at, _)| *at >= start && *at <= end)
            .map(|(_, steps)| steps)
            .sum())
    }

    fn watch_step_count(&self) -> Result<StepSubscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);
            if inner.closed {
                return Err(Error::Other("Pedometer has been closed".into()));
            }
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push(Listener {
                id,
                total: 0,
                sender,
            });
            id
        };

        let weak: Weak<Mutex<ChannelInner>> = Arc::downgrade(&self.inner);
        Ok(StepSubscription::new(receiver, move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.retain(|l| l.id != id);
                tracing::debug!("Released step subscription {}", id);
            }
        }))
    }
}

// ============================================================================
// Tracker
// ============================================================================

/// What a tracking run observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingSummary {
    pub available: bool,
    /// Steps already counted today when tracking started
    pub baseline: u64,
    /// Last total pushed into the store
    pub total: u64,
    /// Live updates received
    pub updates: usize,
}

/// Feeds today's step total from a pedometer into the store.
pub struct StepTracker<'a, A, P: ?Sized> {
    store: &'a WorkoutStore<A>,
    pedometer: &'a P,
}

impl<'a, A: WorkoutApi, P: Pedometer + ?Sized> StepTracker<'a, A, P> {
    pub fn new(store: &'a WorkoutStore<A>, pedometer: &'a P) -> Self {
        Self { store, pedometer }
    }

    /// Steps counted since local midnight
    pub async fn today_so_far(&self) -> Result<u64> {
        let now = Local::now();
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .and_then(|t| t.and_local_timezone(Local).earliest())
            .unwrap_or(now);
        self.pedometer.step_count(midnight, now).await
    }

    /// Track until the pedometer stops reporting.
    ///
    /// Today's count is queried once, immediately before subscribing, and each
    /// live count is added to it. Every run re-queries, so restarting the
    /// tracker never counts the same steps twice. Each positive total is set in
    /// the store and submitted for today.
    pub async fn run(&self) -> Result<TrackingSummary> {
        if !self.pedometer.is_available().await {
            tracing::info!("Pedometer not available");
            return Ok(TrackingSummary {
                available: false,
                baseline: 0,
                total: self.store.steps(),
                updates: 0,
            });
        }

        let today = Local::now().format(DATE_FORMAT).to_string();
        let baseline = self.today_so_far().await?;
        let mut subscription = self.pedometer.watch_step_count()?;
        tracing::info!("Tracking steps for {} from {}", today, baseline);
        self.publish(&today, baseline).await;

        let mut total = baseline;
        let mut updates = 0;

        while let Some(live) = subscription.next().await {
            total = baseline + live;
            updates += 1;
            self.publish(&today, total).await;
        }

        tracing::info!("Step stream ended at {} steps after {} updates", total, updates);
        Ok(TrackingSummary {
            available: true,
            baseline,
            total,
            updates,
        })
    }

    async fn publish(&self, date: &str, total: u64) {
        self.store.update_steps(total);
        if total > 0 {
            self.store.save_steps(date, total).await;
        }
    }
}
