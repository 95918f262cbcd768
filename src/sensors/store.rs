//! # Reading store.
//!
//! Fixed-size table holding the last reading of every sensor slot.
//!
//! ## Rules
//! - Each slot is written only through its own [`SlotHandle`], owned by that
//!   slot's agent; the aggregator only reads.
//! - A [`Reading`] carries its value and receipt time together and is
//!   replaced as a whole, so a reader never pairs a value with the timestamp
//!   of a different update.
//! - An empty slot (`None`) counts as stale.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;

/// One received temperature and when it arrived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Degrees Celsius.
    pub value: f64,
    /// Receipt time.
    pub at: Instant,
}

impl Reading {
    /// A reading is fresh while `now − at < window`.
    #[inline]
    pub fn is_fresh(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.at) < window
    }
}

/// Sum and count of the fresh readings at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Summary {
    pub sum: f64,
    pub count: usize,
}

impl Summary {
    /// Arithmetic mean, or `None` when nothing is fresh.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Last-known reading per sensor slot.
#[derive(Debug)]
pub struct ReadingStore {
    slots: Box<[RwLock<Option<Reading>>]>,
}

impl ReadingStore {
    /// Creates `count` empty slots.
    pub fn new(count: usize) -> Arc<Self> {
        let slots = (0..count).map(|_| RwLock::new(None)).collect();
        Arc::new(Self { slots })
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the write handle of slot `index`.
    pub fn slot(self: &Arc<Self>, index: usize) -> Option<SlotHandle> {
        (index < self.slots.len()).then(|| SlotHandle {
            store: Arc::clone(self),
            index,
        })
    }

    /// Returns the current reading of slot `index`.
    pub fn get(&self, index: usize) -> Option<Reading> {
        let slot = self.slots.get(index)?;
        *slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sums the readings that are fresh at `now`.
    pub fn summarize(&self, now: Instant, window: Duration) -> Summary {
        self.readings()
            .filter(|r| r.is_fresh(now, window))
            .fold(Summary::default(), |acc, r| Summary {
                sum: acc.sum + r.value,
                count: acc.count + 1,
            })
    }

    /// Earliest instant at which a reading that is fresh at `now` turns stale.
    pub fn next_expiry(&self, now: Instant, window: Duration) -> Option<Instant> {
        self.readings()
            .filter(|r| r.is_fresh(now, window))
            .map(|r| r.at + window)
            .min()
    }

    fn readings(&self) -> impl Iterator<Item = Reading> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| *slot.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write(&self, index: usize, reading: Reading) {
        if let Some(slot) = self.slots.get(index) {
            *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(reading);
        }
    }
}

/// Exclusive write access to one slot of a [`ReadingStore`].
///
/// Not `Clone`: the agent that owns it is the slot's only writer.
#[derive(Debug)]
pub struct SlotHandle {
    store: Arc<ReadingStore>,
    index: usize,
}

impl SlotHandle {
    /// Slot position (also the sensor number).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Stores `value` received at `at`, replacing the previous reading.
    pub fn record(&self, value: f64, at: Instant) -> Reading {
        let reading = Reading { value, at };
        self.store.write(self.index, reading);
        reading
    }

    /// Current reading of this slot.
    pub fn current(&self) -> Option<Reading> {
        self.store.get(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(600);

    #[test]
    fn empty_store_has_no_mean() {
        let store = ReadingStore::new(4);
        let summary = store.summarize(Instant::now(), WINDOW);
        assert_eq!(summary, Summary::default());
        assert_eq!(summary.mean(), None);
        assert_eq!(store.next_expiry(Instant::now(), WINDOW), None);
    }

    #[test]
    fn mean_of_fresh_readings() {
        let store = ReadingStore::new(4);
        let now = Instant::now();
        for (i, v) in [10.0, 20.0, 30.0, 40.0].into_iter().enumerate() {
            store.slot(i).unwrap().record(v, now);
        }
        let summary = store.summarize(now + Duration::from_millis(900), WINDOW);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.mean(), Some(25.0));
    }

    #[test]
    fn reading_at_exact_window_is_stale() {
        let store = ReadingStore::new(2);
        let t0 = Instant::now();
        store.slot(0).unwrap().record(20.0, t0);
        store.slot(1).unwrap().record(99.0, t0 + Duration::from_secs(5));

        let almost = t0 + WINDOW - Duration::from_millis(1);
        assert_eq!(store.summarize(almost, WINDOW).count, 2);

        let at_window = t0 + WINDOW;
        let summary = store.summarize(at_window, WINDOW);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.mean(), Some(99.0));
    }

    #[test]
    fn next_expiry_is_earliest_fresh_deadline() {
        let store = ReadingStore::new(3);
        let t0 = Instant::now();
        store.slot(0).unwrap().record(1.0, t0);
        store.slot(2).unwrap().record(2.0, t0 + Duration::from_secs(30));

        assert_eq!(store.next_expiry(t0, WINDOW), Some(t0 + WINDOW));
        let later = t0 + WINDOW;
        assert_eq!(
            store.next_expiry(later, WINDOW),
            Some(t0 + Duration::from_secs(30) + WINDOW)
        );
    }

    #[test]
    fn record_replaces_value_and_time_together() {
        let store = ReadingStore::new(1);
        let slot = store.slot(0).unwrap();
        let t0 = Instant::now();
        slot.record(1.5, t0);
        let t1 = t0 + Duration::from_secs(1);
        slot.record(2.5, t1);
        assert_eq!(slot.current(), Some(Reading { value: 2.5, at: t1 }));
        assert_eq!(store.get(0), slot.current());
    }

    #[test]
    fn concurrent_readers_never_see_mixed_pairs() {
        const WRITES: u64 = 20_000;

        let store = ReadingStore::new(1);
        let slot = store.slot(0).unwrap();
        let t0 = Instant::now();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 1..=WRITES {
                    slot.record(i as f64, t0 + Duration::from_millis(i));
                }
            });

            for _ in 0..3 {
                s.spawn(|| {
                    let mut last = 0.0;
                    while last < WRITES as f64 {
                        let Some(r) = store.get(0) else { continue };
                        let offset = r.at.duration_since(t0).as_millis() as f64;
                        assert_eq!(offset, r.value, "value and time from different writes");
                        assert!(r.value >= last, "slot went backwards");
                        last = r.value;
                    }
                });
            }
        });

        assert_eq!(store.get(0).map(|r| r.value), Some(WRITES as f64));
    }

    #[test]
    fn out_of_range_slot_is_none() {
        let store = ReadingStore::new(2);
        assert!(store.slot(2).is_none());
        assert_eq!(store.get(7), None);
        assert_eq!(store.len(), 2);
    }
}
