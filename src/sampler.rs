//! Rate sampling over monotonically increasing counters.
//!
//! A [`RateSampler`] wraps a [`CounterSource`] and hands out windows of two
//! snapshots plus the elapsed time between them. Two sampling paths exist:
//!
//! 1. **Fresh window** — first call on the sampler, or any call with a
//!    nonzero interval: read, sleep for the interval, read again. Elapsed
//!    time is the requested interval.
//! 2. **Since last call** — subsequent calls with a zero interval: the
//!    previously cached snapshot becomes the old end of the window and one
//!    fresh read becomes the new end. Elapsed time is the wall-clock time
//!    since the cached snapshot was taken.
//!
//! Either way the newest snapshot replaces the cache. A failed read aborts
//! the sample and leaves the cache as it was.

use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::collector::CounterSource;
use crate::error::Result;

/// Two snapshots of one source and the time between them.
#[derive(Debug, Clone)]
pub struct Window<T> {
    pub old: T,
    pub new: T,
    pub elapsed: Duration,
}

/// Delta of a monotonic counter, clamped to zero on wrap-around or reset.
pub fn delta(curr: u64, prev: u64) -> u64 {
    curr.saturating_sub(prev)
}

/// Per-second rate for a counter delta. A zero-length window yields 0.0
/// rather than dividing by zero.
pub fn per_second(delta: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 { 0.0 } else { delta as f64 / secs }
}

struct Cached<T> {
    snapshot: T,
    taken_at: Instant,
}

/// Stateful sampler producing [`Window`]s from a counter source.
///
/// Each sampler owns its cache; independent samplers over the same source
/// kind never interfere.
pub struct RateSampler<S: CounterSource> {
    source: S,
    cache: Option<Cached<S::Snapshot>>,
}

impl<S: CounterSource> RateSampler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Takes one sample window.
    ///
    /// With `interval > 0`, or on the first call ever, both ends of the
    /// window are read in this call with a sleep in between. With
    /// `interval == 0` on a primed sampler, the window runs from the
    /// previous call to now, without sleeping.
    pub fn sample(&mut self, interval: Duration) -> Result<Window<S::Snapshot>> {
        if interval > Duration::ZERO || self.cache.is_none() {
            let old = self.source.snapshot()?;
            thread::sleep(interval);
            let new = self.source.snapshot()?;
            self.cache = Some(Cached {
                snapshot: new.clone(),
                taken_at: Instant::now(),
            });
            trace!(?interval, "fresh sample window");
            return Ok(Window {
                old,
                new,
                elapsed: interval,
            });
        }

        // Primed and interval == 0: window since the last call. The read
        // happens before the cache is replaced, so a failure leaves it as is.
        let new = self.source.snapshot()?;
        let now = Instant::now();
        let Some(prev) = self.cache.replace(Cached {
            snapshot: new.clone(),
            taken_at: now,
        }) else {
            return Err(crate::error::MetricError::NoData(
                "sampler cache empty".into(),
            ));
        };
        let elapsed = now.duration_since(prev.taken_at);
        trace!(?elapsed, "sample window since last call");
        Ok(Window {
            old: prev.snapshot,
            new,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricError;

    /// Source yielding a scripted sequence of counter values.
    struct Scripted {
        values: Vec<Result<u64>>,
        next: usize,
    }

    impl Scripted {
        fn new(values: Vec<Result<u64>>) -> Self {
            Self { values, next: 0 }
        }
    }

    impl CounterSource for Scripted {
        type Snapshot = u64;

        fn snapshot(&mut self) -> Result<u64> {
            let i = self.next;
            self.next += 1;
            match &self.values[i] {
                Ok(v) => Ok(*v),
                Err(_) => Err(MetricError::NoData("scripted failure".into())),
            }
        }
    }

    #[test]
    fn first_call_reads_twice_with_interval_elapsed() {
        let mut sampler = RateSampler::new(Scripted::new(vec![Ok(100), Ok(150)]));
        let w = sampler.sample(Duration::from_millis(10)).unwrap();
        assert_eq!(w.old, 100);
        assert_eq!(w.new, 150);
        assert_eq!(w.elapsed, Duration::from_millis(10));
    }

    #[test]
    fn zero_interval_first_call_still_reads_twice() {
        let mut sampler = RateSampler::new(Scripted::new(vec![Ok(100), Ok(100)]));
        let w = sampler.sample(Duration::ZERO).unwrap();
        assert_eq!(w.old, 100);
        assert_eq!(w.new, 100);
        assert_eq!(w.elapsed, Duration::ZERO);
    }

    #[test]
    fn primed_zero_interval_uses_cache_and_wall_clock() {
        let mut sampler = RateSampler::new(Scripted::new(vec![Ok(100), Ok(150), Ok(400)]));
        sampler.sample(Duration::ZERO).unwrap();

        thread::sleep(Duration::from_millis(5));
        let w = sampler.sample(Duration::ZERO).unwrap();
        assert_eq!(w.old, 150);
        assert_eq!(w.new, 400);
        assert!(w.elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn nonzero_interval_ignores_cache() {
        let mut sampler =
            RateSampler::new(Scripted::new(vec![Ok(100), Ok(150), Ok(200), Ok(300)]));
        sampler.sample(Duration::ZERO).unwrap();

        let w = sampler.sample(Duration::from_millis(1)).unwrap();
        assert_eq!(w.old, 200);
        assert_eq!(w.new, 300);
        assert_eq!(w.elapsed, Duration::from_millis(1));
    }

    #[test]
    fn failed_read_leaves_cache_untouched() {
        let mut sampler = RateSampler::new(Scripted::new(vec![
            Ok(100),
            Ok(150),
            Err(MetricError::NoData("x".into())),
            Ok(700),
        ]));
        sampler.sample(Duration::ZERO).unwrap();

        assert!(sampler.sample(Duration::ZERO).is_err());

        // the cached snapshot is still the one from the successful pass
        let w = sampler.sample(Duration::ZERO).unwrap();
        assert_eq!(w.old, 150);
        assert_eq!(w.new, 700);
    }

    #[test]
    fn delta_clamps_on_counter_reset() {
        assert_eq!(delta(150, 100), 50);
        assert_eq!(delta(10, 100), 0);
    }

    #[test]
    fn per_second_zero_elapsed_is_zero_rate() {
        assert_eq!(per_second(500, Duration::ZERO), 0.0);
        assert_eq!(per_second(500, Duration::from_secs(2)), 250.0);
    }
}
