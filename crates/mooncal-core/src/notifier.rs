//! Observable state holders.
//!
//! A [`StateNotifier`] keeps the last value read from a [`StateSource`] and
//! re-reads it whenever the host delivers one of the [`Signal`]s the source
//! listens for. Subscribers receive a [`ChangedEvent`] with the value before
//! and after the re-read; a new subscriber immediately receives
//! `(current, current)`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use tracing::trace;

use crate::time::system_tz;

/// Host events that may change observed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    DateChanged,
    TimeChanged,
    ZoneChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangedEvent<T> {
    pub before: T,
    pub after: T,
}

/// Wall clock and zone of the host.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn zone(&self) -> Tz;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn zone(&self) -> Tz {
        (**self).zone()
    }
}

/// The real clock. The zone is read from `TZ` on every call unless pinned.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: Option<Tz>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_zone(zone: Tz) -> Self {
        Self { zone: Some(zone) }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn zone(&self) -> Tz {
        self.zone.unwrap_or_else(system_tz)
    }
}

/// A value read from the host and the signals that invalidate it.
pub trait StateSource<T>: Send + Sync {
    fn signals(&self) -> &[Signal];
    fn read(&self) -> T;
}

/// Today's civil date in the clock's zone.
#[derive(Debug, Clone)]
pub struct DateSource<C> {
    clock: C,
}

impl<C: Clock> DateSource<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> StateSource<NaiveDate> for DateSource<C> {
    fn signals(&self) -> &[Signal] {
        &[Signal::DateChanged, Signal::TimeChanged]
    }

    fn read(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.clock.zone()).date_naive()
    }
}

/// The clock's zone.
#[derive(Debug, Clone)]
pub struct ZoneSource<C> {
    clock: C,
}

impl<C: Clock> ZoneSource<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> StateSource<Tz> for ZoneSource<C> {
    fn signals(&self) -> &[Signal] {
        &[Signal::ZoneChanged]
    }

    fn read(&self) -> Tz {
        self.clock.zone()
    }
}

/// Handle returned by [`StateNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&ChangedEvent<T>) + Send + Sync>;

/// Holds the current value of a [`StateSource`] and broadcasts changes.
///
/// Subscribers are called without any lock held, so a callback may
/// subscribe or unsubscribe.
pub struct StateNotifier<T, S> {
    source: S,
    current: Mutex<T>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
    next_id: AtomicU64,
}

impl<T, S> StateNotifier<T, S>
where
    T: Clone + Send,
    S: StateSource<T>,
{
    /// Start with the value the source reports now.
    pub fn new(source: S) -> Self {
        let current = source.read();
        Self {
            source,
            current: Mutex::new(current),
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> T {
        self.current.lock().clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Register `subscriber` and deliver `(current, current)` to it.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&ChangedEvent<T>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber: Subscriber<T> = Arc::new(subscriber);
        self.subscribers.lock().push((id, Arc::clone(&subscriber)));

        let current = self.current();
        subscriber(&ChangedEvent {
            before: current.clone(),
            after: current,
        });
        id
    }

    /// Remove a subscriber; returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Re-read the source if it listens for `signal` and broadcast the
    /// change. Returns false for signals the source ignores.
    pub fn on_signal(&self, signal: Signal) -> bool {
        if !self.source.signals().contains(&signal) {
            trace!(?signal, "signal ignored");
            return false;
        }

        let after = self.source.read();
        let before = std::mem::replace(&mut *self.current.lock(), after.clone());
        let event = ChangedEvent { before, after };

        let subscribers: Vec<Subscriber<T>> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();
        trace!(?signal, subscribers = subscribers.len(), "broadcasting state change");
        for subscriber in subscribers {
            subscriber(&event);
        }
        true
    }
}

impl<T: fmt::Debug, S> fmt::Debug for StateNotifier<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNotifier")
            .field("current", &*self.current.lock())
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// A clock the test moves by hand.
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
        zone: Mutex<Tz>,
    }

    impl ManualClock {
        pub(crate) fn new(now: DateTime<Utc>, zone: Tz) -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(now),
                zone: Mutex::new(zone),
            })
        }

        pub(crate) fn set_now(&self, now: DateTime<Utc>) {
            *self.now.lock() = now;
        }

        pub(crate) fn set_zone(&self, zone: Tz) {
            *self.zone.lock() = zone;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }

        fn zone(&self) -> Tz {
            *self.zone.lock()
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recorder<T: Clone + Send + 'static>()
    -> (Arc<Mutex<Vec<ChangedEvent<T>>>>, impl Fn(&ChangedEvent<T>) + Send + Sync + 'static) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (events, move |e: &ChangedEvent<T>| sink.lock().push(e.clone()))
    }

    #[test]
    fn subscribe_delivers_current_state() {
        let clock = ManualClock::new(at(2024, 1, 11, 12), Tz::UTC);
        let notifier = StateNotifier::new(DateSource::new(Arc::clone(&clock)));
        let (events, subscriber) = recorder::<NaiveDate>();

        notifier.subscribe(subscriber);

        let events = events.lock();
        assert_eq!(
            *events,
            vec![ChangedEvent {
                before: date(2024, 1, 11),
                after: date(2024, 1, 11)
            }]
        );
    }

    #[test]
    fn date_change_is_broadcast_to_every_subscriber() {
        let clock = ManualClock::new(at(2024, 1, 11, 12), Tz::UTC);
        let notifier = StateNotifier::new(DateSource::new(Arc::clone(&clock)));
        let (first, s1) = recorder::<NaiveDate>();
        let (second, s2) = recorder::<NaiveDate>();
        notifier.subscribe(s1);
        notifier.subscribe(s2);

        clock.set_now(at(2024, 1, 12, 0));
        assert!(notifier.on_signal(Signal::DateChanged));

        let expected = ChangedEvent {
            before: date(2024, 1, 11),
            after: date(2024, 1, 12),
        };
        assert_eq!(first.lock().last(), Some(&expected));
        assert_eq!(second.lock().last(), Some(&expected));
        assert_eq!(notifier.current(), date(2024, 1, 12));
    }

    #[test]
    fn date_source_ignores_zone_signal() {
        let clock = ManualClock::new(at(2024, 1, 11, 12), Tz::UTC);
        let notifier = StateNotifier::new(DateSource::new(Arc::clone(&clock)));
        let (events, subscriber) = recorder::<NaiveDate>();
        notifier.subscribe(subscriber);

        clock.set_now(at(2024, 1, 12, 12));
        assert!(!notifier.on_signal(Signal::ZoneChanged));
        assert_eq!(events.lock().len(), 1);
        assert_eq!(notifier.current(), date(2024, 1, 11));
    }

    #[test]
    fn date_follows_clock_zone() {
        // 2024-01-11T20:00Z is already Jan 12 in Tokyo.
        let clock = ManualClock::new(at(2024, 1, 11, 20), Tz::UTC);
        let notifier = StateNotifier::new(DateSource::new(Arc::clone(&clock)));
        assert_eq!(notifier.current(), date(2024, 1, 11));

        clock.set_zone(chrono_tz::Asia::Tokyo);
        notifier.on_signal(Signal::TimeChanged);
        assert_eq!(notifier.current(), date(2024, 1, 12));
    }

    #[test]
    fn zone_change_is_broadcast() {
        let clock = ManualClock::new(at(2024, 1, 11, 12), Tz::UTC);
        let notifier = StateNotifier::new(ZoneSource::new(Arc::clone(&clock)));
        let (events, subscriber) = recorder::<Tz>();
        notifier.subscribe(subscriber);

        clock.set_zone(chrono_tz::Europe::Berlin);
        assert!(notifier.on_signal(Signal::ZoneChanged));
        assert!(!notifier.on_signal(Signal::DateChanged));

        assert_eq!(
            events.lock().last(),
            Some(&ChangedEvent {
                before: Tz::UTC,
                after: chrono_tz::Europe::Berlin
            })
        );
    }

    #[test]
    fn unsubscribed_callbacks_are_not_called() {
        let clock = ManualClock::new(at(2024, 1, 11, 12), Tz::UTC);
        let notifier = StateNotifier::new(DateSource::new(Arc::clone(&clock)));
        let (events, subscriber) = recorder::<NaiveDate>();
        let id = notifier.subscribe(subscriber);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert_eq!(notifier.subscriber_count(), 0);

        clock.set_now(at(2024, 1, 12, 12));
        notifier.on_signal(Signal::DateChanged);
        assert_eq!(events.lock().len(), 1);
    }

    #[test]
    fn callback_may_subscribe_during_broadcast() {
        let clock = ManualClock::new(at(2024, 1, 11, 12), Tz::UTC);
        let notifier = Arc::new(StateNotifier::new(DateSource::new(Arc::clone(&clock))));
        let inner = Arc::clone(&notifier);
        notifier.subscribe(move |e: &ChangedEvent<NaiveDate>| {
            if e.before != e.after {
                inner.subscribe(|_| {});
            }
        });

        clock.set_now(at(2024, 1, 12, 12));
        notifier.on_signal(Signal::DateChanged);
        assert_eq!(notifier.subscriber_count(), 2);
    }
}
