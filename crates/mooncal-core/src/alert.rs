//! Notify when the moon reaches a chosen phase.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::images::PhaseImages;
use crate::meeus::MeeusOracle;
use crate::models::Phase;
use crate::notifier::{ChangedEvent, Clock, StateNotifier, StateSource, SubscriptionId};
use crate::oracle::PhaseOracle;
use crate::resolver::MoonPhaseResolver;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub date: NaiveDate,
    pub phase: Phase,
    pub title: String,
    pub image: String,
}

impl Notification {
    pub fn new(date: NaiveDate, phase: Phase, images: &PhaseImages) -> Self {
        Self {
            date,
            phase,
            title: format!("Moon phase happened: {}", phase),
            image: images.get(phase).to_string(),
        }
    }
}

/// Where notifications are delivered.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> NotificationSink for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    received: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().clone()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notification: Notification) {
        self.received.lock().push(notification);
    }
}

/// Checks each new date against a target phase.
///
/// The phase is resolved in the clock's current zone. With no target the
/// alert is switched off.
pub struct PhaseAlert<O = MeeusOracle> {
    resolver: Arc<MoonPhaseResolver<O>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    images: PhaseImages,
    target: RwLock<Option<Phase>>,
}

impl<O: PhaseOracle> PhaseAlert<O> {
    pub fn new(
        resolver: Arc<MoonPhaseResolver<O>>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            resolver,
            clock,
            sink,
            images: PhaseImages::default(),
            target: RwLock::new(None),
        }
    }

    pub fn with_images(mut self, images: PhaseImages) -> Self {
        self.images = images;
        self
    }

    pub fn with_target(self, target: Option<Phase>) -> Self {
        self.set_target(target);
        self
    }

    pub fn target(&self) -> Option<Phase> {
        *self.target.read()
    }

    pub fn set_target(&self, target: Option<Phase>) {
        *self.target.write() = target;
    }

    /// Resolve `date` and notify if it is the target phase.
    pub fn check(&self, date: NaiveDate) -> Result<Option<Notification>> {
        let Some(target) = self.target() else {
            return Ok(None);
        };

        let phase = self.resolver.phase(date, self.clock.zone())?;
        if phase != target {
            debug!(%date, %phase, %target, "phase alert not triggered");
            return Ok(None);
        }

        let notification = Notification::new(date, phase, &self.images);
        self.sink.notify(notification.clone());
        Ok(Some(notification))
    }

    /// React to a date change. Failures are logged since there is no caller
    /// to return them to.
    pub fn handle(&self, event: &ChangedEvent<NaiveDate>) {
        if let Err(err) = self.check(event.after) {
            warn!(date = %event.after, error = %err, "phase alert check failed");
        }
    }
}

impl<O: PhaseOracle + 'static> PhaseAlert<O> {
    /// Subscribe to date changes. The current date is checked right away.
    pub fn attach<S>(self: &Arc<Self>, dates: &StateNotifier<NaiveDate, S>) -> SubscriptionId
    where
        S: StateSource<NaiveDate>,
    {
        let alert = Arc::clone(self);
        dates.subscribe(move |event| alert.handle(event))
    }
}

impl<O> fmt::Debug for PhaseAlert<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseAlert")
            .field("target", &*self.target.read())
            .finish_non_exhaustive()
    }
}
