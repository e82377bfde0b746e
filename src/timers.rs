//! Timers
//!
//! Cancellable scheduled events, each owned by the screen that started it.
//! Leaving a screen cancels everything it owns, so a fired event can always
//! assume its owner is still current. Cancelled keys are simply gone from
//! the arena: cancelling twice, or cancelling a timer that already fired,
//! does nothing.

use jiff::{SignedDuration, Timestamp};
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

use crate::screens::Screen;

new_key_type! {
    /// Timer Key
    pub struct TimerKey;
}

/// Errors raised while scheduling timers.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Repeating timers need a positive period.
    #[error("timer period must be positive, got {0:?}")]
    NonPositivePeriod(SignedDuration),

    /// The due time could not be represented.
    #[error(transparent)]
    Time(#[from] jiff::Error),
}

#[derive(Debug, Clone)]
struct Timer<E> {
    due: Timestamp,
    seq: u64,
    owner: Screen,
    period: Option<SignedDuration>,
    event: E,
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<E> {
    /// Key of the timer; still scheduled if the timer repeats
    pub key: TimerKey,

    /// When the timer was due
    pub at: Timestamp,

    /// The scheduled event
    pub event: E,
}

/// Timers
#[derive(Debug)]
pub struct Timers<E> {
    timers: SlotMap<TimerKey, Timer<E>>,
    next_seq: u64,
}

impl<E> Default for Timers<E> {
    fn default() -> Self {
        Self {
            timers: SlotMap::with_key(),
            next_seq: 0,
        }
    }
}

impl<E: Clone> Timers<E> {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire once at `due`.
    pub fn once(&mut self, owner: Screen, due: Timestamp, event: E) -> TimerKey {
        self.insert(owner, due, None, event)
    }

    /// Schedule `event` to fire at `first_due` and then every `period`.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::NonPositivePeriod`] if `period` is zero or negative.
    pub fn every(
        &mut self,
        owner: Screen,
        first_due: Timestamp,
        period: SignedDuration,
        event: E,
    ) -> Result<TimerKey, TimerError> {
        if !period.is_positive() {
            return Err(TimerError::NonPositivePeriod(period));
        }

        Ok(self.insert(owner, first_due, Some(period), event))
    }

    fn insert(
        &mut self,
        owner: Screen,
        due: Timestamp,
        period: Option<SignedDuration>,
        event: E,
    ) -> TimerKey {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        self.timers.insert(Timer {
            due,
            seq,
            owner,
            period,
            event,
        })
    }

    /// Cancel a timer. Returns whether it was still scheduled.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        self.timers.remove(key).is_some()
    }

    /// Cancel every timer owned by `owner`. Returns how many were cancelled.
    pub fn cancel_owned_by(&mut self, owner: Screen) -> usize {
        self.cancel_where(|timer_owner, _| timer_owner == owner)
    }

    /// Cancel every timer whose event matches. Returns how many were cancelled.
    pub fn cancel_matching(&mut self, mut matches: impl FnMut(&E) -> bool) -> usize {
        self.cancel_where(|_, event| matches(event))
    }

    fn cancel_where(&mut self, mut matches: impl FnMut(Screen, &E) -> bool) -> usize {
        let before = self.timers.len();

        self.timers
            .retain(|_, timer| !matches(timer.owner, &timer.event));

        before - self.timers.len()
    }

    /// Cancel every timer.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// When the next timer is due.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.timers.values().map(|timer| timer.due).min()
    }

    /// Take the earliest timer due at or before `now`.
    ///
    /// One-shot timers are removed; repeating timers are re-armed one period
    /// later. Timers due at the same instant fire in scheduling order.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::Time`] if a repeating timer's next due time overflows.
    pub fn pop_due(&mut self, now: Timestamp) -> Result<Option<Fired<E>>, TimerError> {
        let Some(key) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))
            .map(|(key, _)| key)
        else {
            return Ok(None);
        };

        let Some(timer) = self.timers.get_mut(key) else {
            return Ok(None);
        };

        let fired = Fired {
            key,
            at: timer.due,
            event: timer.event.clone(),
        };

        match timer.period {
            Some(period) => {
                timer.due = timer.due.checked_add(period)?;
            }
            None => {
                self.timers.remove(key);
            }
        }

        Ok(Some(fired))
    }

    /// Number of scheduled timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn at(seconds: i64) -> Result<Timestamp, jiff::Error> {
        Timestamp::from_second(seconds)
    }

    #[test]
    fn once_fires_after_due_and_not_before() -> TestResult {
        let mut timers = Timers::new();
        let key = timers.once(Screen::Checkout, at(10)?, "confirm");

        assert_eq!(timers.pop_due(at(9)?)?, None);

        let fired = timers.pop_due(at(10)?)?;

        assert_eq!(
            fired,
            Some(Fired {
                key,
                at: at(10)?,
                event: "confirm"
            })
        );
        assert!(!timers.cancel(key));
        assert_eq!(timers.pop_due(at(100)?)?, None);

        Ok(())
    }

    #[test]
    fn every_rearms_by_period() -> TestResult {
        let mut timers = Timers::new();
        let key = timers.every(Screen::Checkout, at(1)?, SignedDuration::from_secs(1), "tick")?;
        let now = at(3)?;

        let fired: Vec<Timestamp> = std::iter::from_fn(|| timers.pop_due(now).ok().flatten())
            .map(|fired| fired.at)
            .collect();

        assert_eq!(fired, vec![at(1)?, at(2)?, at(3)?]);
        assert_eq!(timers.next_due(), Some(at(4)?));
        assert!(timers.cancel(key));

        Ok(())
    }

    #[test]
    fn every_rejects_non_positive_period() -> TestResult {
        let mut timers = Timers::new();

        let result = timers.every(Screen::Checkout, at(1)?, SignedDuration::ZERO, "tick");

        assert!(matches!(result, Err(TimerError::NonPositivePeriod(_))));
        assert!(timers.is_empty());

        Ok(())
    }

    #[test]
    fn earliest_due_fires_first() -> TestResult {
        let mut timers = Timers::new();
        timers.once(Screen::Checkout, at(5)?, "late");
        timers.once(Screen::Checkout, at(2)?, "early");
        timers.once(Screen::Checkout, at(2)?, "early-second");
        let now = at(10)?;

        let order: Vec<&str> = std::iter::from_fn(|| timers.pop_due(now).ok().flatten())
            .map(|fired| fired.event)
            .collect();

        assert_eq!(order, vec!["early", "early-second", "late"]);

        Ok(())
    }

    #[test]
    fn cancelled_timer_never_fires() -> TestResult {
        let mut timers = Timers::new();
        let key = timers.once(Screen::Checkout, at(1)?, "confirm");

        assert!(timers.cancel(key));
        assert!(!timers.cancel(key));
        assert_eq!(timers.pop_due(at(10)?)?, None);

        Ok(())
    }

    #[test]
    fn cancel_owned_by_only_touches_owner() -> TestResult {
        let mut timers = Timers::new();
        timers.once(Screen::Checkout, at(1)?, "confirm");
        timers.every(Screen::Checkout, at(1)?, SignedDuration::from_secs(1), "tick")?;
        let kept = timers.once(Screen::Merchant, at(1)?, "listing");

        assert_eq!(timers.cancel_owned_by(Screen::Checkout), 2);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_due(), Some(at(1)?));
        assert!(timers.cancel(kept));

        Ok(())
    }

    #[test]
    fn cancel_matching_filters_by_event() -> TestResult {
        let mut timers = Timers::new();
        timers.once(Screen::Checkout, at(1)?, 1_u8);
        timers.once(Screen::Checkout, at(1)?, 2_u8);

        assert_eq!(timers.cancel_matching(|event| *event == 2), 1);
        assert_eq!(timers.pop_due(at(1)?)?.map(|fired| fired.event), Some(1));

        Ok(())
    }
}
