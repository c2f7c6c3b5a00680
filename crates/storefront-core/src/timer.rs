//! ============================================================================
//! Timers - Deferred actions with cancellation
//! ============================================================================
//! Controllers schedule transient-message dismissal and delayed redirects
//! here instead of spawning sleeps. A driver polls `take_due()` (the CLI
//! sleeps on `next_deadline()`); tests move a `ManualClock` forward.
//! ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary origin
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Virtual time that only moves when told to
#[derive(Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward, saturating at `u64::MAX` milliseconds
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(ms))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.now_ms.load(Ordering::SeqCst))
    }
}

/// Handle returned by `schedule_after`, used to cancel the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Timer<A> {
    handle: TimerHandle,
    deadline: Duration,
    action: A,
}

/// Pending deferred actions, fired in deadline order
pub struct TimerQueue<A> {
    clock: Arc<dyn Clock>,
    next_id: u64,
    pending: Vec<Timer<A>>,
}

impl<A> TimerQueue<A> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Run `action` once `delay` has elapsed
    pub fn schedule_after(&mut self, delay: Duration, action: A) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(Timer {
            handle,
            deadline: self.clock.now().saturating_add(delay),
            action,
        });
        handle
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|t| t.handle == handle)
    }

    /// Remove and return every action whose deadline has passed.
    /// Ties fire in scheduling order.
    pub fn take_due(&mut self) -> Vec<A> {
        let now = self.clock.now();
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|t| t.deadline <= now);
        self.pending = rest;
        due.sort_by_key(|t| (t.deadline, t.handle.0));
        due.into_iter().map(|t| t.action).collect()
    }

    /// Time until the earliest pending deadline (zero if already due)
    pub fn next_deadline(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.pending
            .iter()
            .map(|t| t.deadline.saturating_sub(now))
            .min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> (Arc<ManualClock>, TimerQueue<&'static str>) {
        let clock = Arc::new(ManualClock::new());
        let queue = TimerQueue::new(clock.clone());
        (clock, queue)
    }

    #[test]
    fn test_fires_only_after_delay() {
        let (clock, mut timers) = queue();
        timers.schedule_after(Duration::from_millis(1000), "redirect");

        clock.advance(Duration::from_millis(999));
        assert!(timers.take_due().is_empty());

        clock.advance(Duration::from_millis(1));
        assert_eq!(timers.take_due(), vec!["redirect"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let (clock, mut timers) = queue();
        timers.schedule_after(Duration::from_millis(2000), "clear");
        timers.schedule_after(Duration::from_millis(500), "login");
        timers.schedule_after(Duration::from_millis(500), "second");

        clock.advance(Duration::from_secs(5));
        assert_eq!(timers.take_due(), vec!["login", "second", "clear"]);
    }

    #[test]
    fn test_cancel() {
        let (clock, mut timers) = queue();
        let handle = timers.schedule_after(Duration::from_millis(10), "x");
        assert!(timers.is_pending(handle));
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));

        clock.advance(Duration::from_millis(20));
        assert!(timers.take_due().is_empty());
    }

    #[test]
    fn test_manual_clock_saturates() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(5));
        clock.advance(Duration::MAX);
        assert_eq!(clock.now(), Duration::from_millis(u64::MAX));

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_schedule_near_end_of_time() {
        let (clock, mut timers) = queue();
        clock.advance(Duration::MAX);
        timers.schedule_after(Duration::MAX, "never");
        assert!(timers.take_due().is_empty());
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_next_deadline() {
        let (clock, mut timers) = queue();
        assert_eq!(timers.next_deadline(), None);

        timers.schedule_after(Duration::from_millis(300), "a");
        timers.schedule_after(Duration::from_millis(100), "b");
        assert_eq!(timers.next_deadline(), Some(Duration::from_millis(100)));

        clock.advance(Duration::from_millis(150));
        assert_eq!(timers.next_deadline(), Some(Duration::ZERO));
    }
}
