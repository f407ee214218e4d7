use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use practice_core::Clock;

/// Wall-clock deadline for a timed quiz.
///
/// Remaining time is recomputed from `started_at` on every check, so a
/// suspended process catches up instead of drifting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    started_at: DateTime<Utc>,
    limit: Duration,
}

impl Countdown {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, limit_secs: u32) -> Self {
        Self {
            started_at,
            limit: Duration::seconds(i64::from(limit_secs)),
        }
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + self.limit
    }

    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.deadline() - now).max(Duration::zero())
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) <= Duration::zero()
    }
}

/// Messages sent by a running [`CountdownTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: Duration },
    Expired,
}

/// Background poller for a [`Countdown`].
///
/// The task only reports; the owner of the session applies the expiry. The
/// task is aborted when the handle is cancelled or dropped.
#[derive(Debug)]
pub struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawn the poller on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(
        countdown: Countdown,
        clock: Clock,
        tick: StdDuration,
        events: UnboundedSender<TimerEvent>,
    ) -> Self {
        let tick = tick.max(StdDuration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = clock.now();
                if countdown.is_expired(now) {
                    let _ = events.send(TimerEvent::Expired);
                    break;
                }
                let remaining = countdown.remaining(now);
                if events.send(TimerEvent::Tick { remaining }).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Stop the poller.
    pub fn cancel(self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::time::fixed_now;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn remaining_is_derived_from_wall_clock() {
        let countdown = Countdown::new(fixed_now(), 10);
        assert_eq!(countdown.remaining(fixed_now()), Duration::seconds(10));
        assert_eq!(
            countdown.remaining(fixed_now() + Duration::milliseconds(2_500)),
            Duration::milliseconds(7_500)
        );
        assert!(!countdown.is_expired(fixed_now() + Duration::seconds(9)));
        assert!(countdown.is_expired(fixed_now() + Duration::seconds(10)));
        assert_eq!(
            countdown.remaining(fixed_now() + Duration::hours(1)),
            Duration::zero()
        );
    }

    #[tokio::test]
    async fn timer_reports_expiry_and_stops() {
        let (tx, mut rx) = unbounded_channel();
        let countdown = Countdown::new(fixed_now(), 1);
        let clock = Clock::fixed(fixed_now() + Duration::seconds(5));
        let _timer = CountdownTimer::spawn(countdown, clock, StdDuration::from_millis(5), tx);

        assert_eq!(rx.recv().await, Some(TimerEvent::Expired));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn timer_ticks_with_remaining_time() {
        let (tx, mut rx) = unbounded_channel();
        let countdown = Countdown::new(fixed_now(), 30);
        let clock = Clock::fixed(fixed_now() + Duration::seconds(12));
        let _timer = CountdownTimer::spawn(countdown, clock, StdDuration::from_millis(5), tx);

        assert_eq!(
            rx.recv().await,
            Some(TimerEvent::Tick {
                remaining: Duration::seconds(18)
            })
        );
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_task() {
        let (tx, mut rx) = unbounded_channel();
        let countdown = Countdown::new(fixed_now(), 30);
        let timer = CountdownTimer::spawn(
            countdown,
            Clock::fixed(fixed_now()),
            StdDuration::from_millis(5),
            tx,
        );
        assert!(matches!(rx.recv().await, Some(TimerEvent::Tick { .. })));

        drop(timer);
        // Already-queued ticks may drain first; the channel then closes.
        let drained = tokio::time::timeout(StdDuration::from_secs(1), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
    }

    #[tokio::test]
    async fn system_clock_expiry_happens_within_one_tick() {
        let (tx, mut rx) = unbounded_channel();
        let countdown = Countdown::new(Utc::now(), 1);
        let _timer =
            CountdownTimer::spawn(countdown, Clock::system(), StdDuration::from_millis(20), tx);

        let expired = tokio::time::timeout(StdDuration::from_secs(3), async {
            loop {
                match rx.recv().await {
                    Some(TimerEvent::Expired) => return true,
                    Some(TimerEvent::Tick { .. }) => {}
                    None => return false,
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(expired);
    }
}
