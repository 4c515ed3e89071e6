use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running { deadline: Instant },
    Stopped { remaining: Duration },
    Expired,
}

/// Countdown for a single round.
///
/// The timer never counts ticks. Every query recomputes the remaining time from the deadline, so
/// late or coalesced ticks only delay the expiration signal, they never skew it.
#[derive(Debug, Clone)]
pub struct RoundTimer {
    duration: Duration,
    state: TimerState,
}

impl RoundTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: TimerState::Idle,
        }
    }

    pub fn from_secs(seconds: u32) -> Self {
        Self::new(Duration::from_secs(seconds.into()))
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn is_expired(&self) -> bool {
        self.state == TimerState::Expired
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Running { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Idle or Stopped -> Running with a fresh deadline. Returns false if nothing changed.
    pub fn start(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Idle | TimerState::Stopped { .. } => {
                self.state = TimerState::Running {
                    deadline: now + self.duration,
                };
                true
            }
            TimerState::Running { .. } | TimerState::Expired => false,
        }
    }

    /// Running -> Stopped, only if the deadline has not been reached at `now`.
    ///
    /// A late stop leaves the timer running so the next `tick` still delivers the expiration.
    pub fn stop(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Running { deadline } if now < deadline => {
                self.state = TimerState::Stopped {
                    remaining: deadline - now,
                };
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self, duration: Duration) {
        self.duration = duration;
        self.state = TimerState::Idle;
    }

    /// Returns true exactly once per run: on the call that observes the deadline elapsed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.state {
            TimerState::Running { deadline } if now >= deadline => {
                self.state = TimerState::Expired;
                true
            }
            _ => false,
        }
    }

    /// Forces a running timer to expire now. Returns true if it was running.
    pub fn expire(&mut self) -> bool {
        if self.is_running() {
            self.state = TimerState::Expired;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.state {
            TimerState::Idle => self.duration,
            TimerState::Running { deadline } => deadline.saturating_duration_since(now),
            TimerState::Stopped { remaining } => remaining,
            TimerState::Expired => Duration::ZERO,
        }
    }

    /// Fraction of the countdown left, in [0, 1].
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 0.;
        }
        (self.remaining(now).as_secs_f64() / self.duration.as_secs_f64()).clamp(0., 1.)
    }

    /// `MM:SS`, rounding partial seconds up so the display only reads 00:00 once expired.
    pub fn format_remaining(&self, now: Instant) -> String {
        format_countdown(self.remaining(now))
    }
}

pub fn format_countdown(remaining: Duration) -> String {
    let total_seconds = remaining.as_millis().div_ceil(1000);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

#[test]
fn fires_exactly_once() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(30);
    assert!(timer.start(t0));

    assert!(!timer.tick(t0 + Duration::from_secs(29)));
    assert!(timer.tick(t0 + Duration::from_secs(30)));
    assert!(!timer.tick(t0 + Duration::from_secs(31)));
    assert!(!timer.tick(t0 + Duration::from_secs(600)));
    assert!(timer.is_expired());
}

#[test]
fn missed_ticks_still_expire() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(10);
    timer.start(t0);

    // Backgrounded host: the first tick arrives long after the deadline
    assert!(timer.tick(t0 + Duration::from_secs(300)));
    assert_eq!(timer.remaining(t0 + Duration::from_secs(300)), Duration::ZERO);
}

#[test]
fn stop_before_deadline_prevents_expiration() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(10);
    timer.start(t0);

    assert!(timer.stop(t0 + Duration::from_secs(4)));
    assert_eq!(timer.state(), TimerState::Stopped { remaining: Duration::from_secs(6) });
    assert!(!timer.tick(t0 + Duration::from_secs(10)));
    assert!(!timer.tick(t0 + Duration::from_secs(100)));
    assert!(!timer.is_expired());
}

#[test]
fn late_stop_is_refused() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(10);
    timer.start(t0);

    assert!(!timer.stop(t0 + Duration::from_secs(10)));
    assert!(timer.is_running());
    assert!(timer.tick(t0 + Duration::from_secs(10)));
}

#[test]
fn restart_after_stop_uses_full_duration() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(10);
    timer.start(t0);
    timer.stop(t0 + Duration::from_secs(3));

    let t1 = t0 + Duration::from_secs(20);
    assert!(timer.start(t1));
    assert_eq!(timer.deadline(), Some(t1 + Duration::from_secs(10)));
    assert!(!timer.start(t1));
}

#[test]
fn reset_cancels_pending_expiration() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(10);
    timer.start(t0);
    timer.reset(Duration::from_secs(20));

    assert_eq!(timer.state(), TimerState::Idle);
    assert!(!timer.tick(t0 + Duration::from_secs(15)));
    assert_eq!(timer.remaining(t0), Duration::from_secs(20));

    timer.start(t0 + Duration::from_secs(15));
    assert!(!timer.tick(t0 + Duration::from_secs(34)));
    assert!(timer.tick(t0 + Duration::from_secs(35)));
}

#[test]
fn expired_timer_cannot_restart_without_reset() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(1);
    timer.start(t0);
    timer.tick(t0 + Duration::from_secs(1));

    assert!(!timer.start(t0 + Duration::from_secs(2)));
    timer.reset(Duration::from_secs(1));
    assert!(timer.start(t0 + Duration::from_secs(2)));
}

#[test]
fn countdown_display() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::from_secs(90);
    assert_eq!(timer.format_remaining(t0), "01:30");
    assert_eq!(timer.progress(t0), 1.);

    timer.start(t0);
    assert_eq!(timer.format_remaining(t0 + Duration::from_millis(100)), "01:30");
    assert_eq!(timer.format_remaining(t0 + Duration::from_millis(30_500)), "01:00");
    assert_eq!(timer.format_remaining(t0 + Duration::from_millis(89_999)), "00:01");
    assert_eq!(timer.format_remaining(t0 + Duration::from_secs(90)), "00:00");
    assert!((timer.progress(t0 + Duration::from_secs(45)) - 0.5).abs() < 1e-9);

    assert_eq!(RoundTimer::from_secs(0).progress(t0), 0.);
}
