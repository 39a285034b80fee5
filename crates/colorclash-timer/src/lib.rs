//! Cancellable round countdown for Colorclash.
//!
//! A [`RoundTimer`] counts a round down one second at a time on the Tokio
//! clock. It is owned by exactly one room and polled from inside the room
//! actor's `tokio::select!` loop, so every tick is serialized with player
//! commands:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         event = timer.wait_for_tick() => { /* broadcast tick or end round */ }
//!         Some(cmd) = cmd_rx.recv() => { /* handle command */ }
//!     }
//! }
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──start──→ Running ──(reaches 0)──→ Expired
//!                    │
//!                    └──cancel──→ Cancelled
//! ```
//!
//! A timer runs once. Rooms build a fresh timer per round and cancel the
//! outgoing one first, so a stale countdown can never fire into a later
//! round.
//!
//! # Broadcast throttling
//!
//! Not every second is worth sending to clients. [`RoundTimer::wait_for_tick`]
//! only resolves for seconds that are a multiple of
//! [`TimerConfig::broadcast_every`] or inside the final
//! [`TimerConfig::countdown_from`] seconds, plus the single
//! [`TimerEvent::Expired`].

use std::fmt;
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Cadence and broadcast throttling for a [`RoundTimer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerConfig {
    /// Wall time per countdown step. Default: 1 second.
    pub tick_period: Duration,
    /// Emit a tick whenever the remaining seconds are a multiple of this.
    /// Default: 5. Zero disables the stride (only the final countdown
    /// is emitted).
    pub broadcast_every: u32,
    /// Emit every tick once the remaining seconds drop to this or below.
    /// Default: 10.
    pub countdown_from: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            broadcast_every: 5,
            countdown_from: 10,
        }
    }
}

impl TimerConfig {
    /// Whether a tick with `remaining` seconds left should reach clients.
    pub fn should_broadcast(&self, remaining: u32) -> bool {
        remaining <= self.countdown_from
            || (self.broadcast_every > 0 && remaining % self.broadcast_every == 0)
    }
}

// ---------------------------------------------------------------------------
// State, events, errors
// ---------------------------------------------------------------------------

/// Where a timer is in its one-shot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Cancelled,
}

impl TimerState {
    /// `true` once the timer can never fire again.
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled)
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Something the room needs to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// A throttled countdown step; `remaining` is at least 1.
    Tick { remaining: u32 },
    /// The countdown reached zero. Emitted exactly once per timer.
    Expired,
}

/// Errors from illegal lifecycle calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// `start` was called on a timer that already ran.
    #[error("timer can only start from idle, it is {0}")]
    NotIdle(TimerState),

    /// `cancel` was called on a timer that isn't counting down.
    #[error("timer can only be cancelled while running, it is {0}")]
    NotRunning(TimerState),

    /// A countdown must last at least one second.
    #[error("timer duration must be at least one second")]
    ZeroDuration,
}

// ---------------------------------------------------------------------------
// RoundTimer
// ---------------------------------------------------------------------------

/// A one-shot, cancellable countdown.
#[derive(Debug)]
pub struct RoundTimer {
    config: TimerConfig,
    state: TimerState,
    duration: u32,
    remaining: u32,
    /// When the next countdown step is due. `None` unless running.
    next_tick: Option<Instant>,
}

impl RoundTimer {
    /// Creates an idle timer.
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            state: TimerState::Idle,
            duration: 0,
            remaining: 0,
            next_tick: None,
        }
    }

    /// Starts counting down from `secs`.
    ///
    /// # Errors
    /// [`TimerError::NotIdle`] if the timer already ran,
    /// [`TimerError::ZeroDuration`] if `secs` is 0.
    pub fn start(&mut self, secs: u32) -> Result<(), TimerError> {
        if self.state != TimerState::Idle {
            return Err(TimerError::NotIdle(self.state));
        }
        if secs == 0 {
            return Err(TimerError::ZeroDuration);
        }
        self.state = TimerState::Running;
        self.duration = secs;
        self.remaining = secs;
        self.next_tick = Some(Instant::now() + self.config.tick_period);
        debug!(secs, "round timer started");
        Ok(())
    }

    /// Stops the countdown. No tick or expiry is produced afterwards.
    ///
    /// # Errors
    /// [`TimerError::NotRunning`] unless the timer is running.
    pub fn cancel(&mut self) -> Result<(), TimerError> {
        if self.state != TimerState::Running {
            return Err(TimerError::NotRunning(self.state));
        }
        self.state = TimerState::Cancelled;
        self.next_tick = None;
        debug!(remaining = self.remaining, "round timer cancelled");
        Ok(())
    }

    /// Performs one countdown step without waiting.
    ///
    /// Returns the event clients should see for this step, or `None` for a
    /// throttled step. Does nothing unless the timer is running. The async
    /// [`wait_for_tick`](Self::wait_for_tick) is built on this; tests can
    /// drive it directly.
    pub fn advance(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.state = TimerState::Expired;
            self.next_tick = None;
            debug!(secs = self.duration, "round timer expired");
            return Some(TimerEvent::Expired);
        }
        trace!(remaining = self.remaining, "round timer step");
        self.config
            .should_broadcast(self.remaining)
            .then_some(TimerEvent::Tick {
                remaining: self.remaining,
            })
    }

    /// Waits for the next broadcast-worthy step or the expiry.
    ///
    /// Pends forever unless the timer is running, which makes it safe to
    /// leave in a `select!` branch between rounds. Cancel-safe: dropping
    /// the future mid-sleep loses nothing.
    pub async fn wait_for_tick(&mut self) -> TimerEvent {
        loop {
            let next = match (self.state, self.next_tick) {
                (TimerState::Running, Some(next)) => next,
                _ => std::future::pending().await,
            };
            time::sleep_until(next).await;
            // Keep the original cadence even if we woke up late.
            self.next_tick = Some(next + self.config.tick_period);
            if let Some(event) = self.advance() {
                return event;
            }
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Whole seconds left. Frozen once cancelled; 0 once expired.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The duration passed to [`start`](Self::start).
    pub fn duration(&self) -> u32 {
        self.duration
    }
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(secs: u32) -> RoundTimer {
        let mut timer = RoundTimer::default();
        timer.start(secs).unwrap();
        timer
    }

    #[test]
    fn test_new_timer_is_idle() {
        let timer = RoundTimer::default();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.remaining(), 0);
        assert!(!timer.state().is_stopped());
    }

    #[test]
    fn test_should_broadcast_rule() {
        let cfg = TimerConfig::default();
        let broadcast: Vec<u32> =
            (1..=30).filter(|r| cfg.should_broadcast(*r)).collect();
        assert_eq!(
            broadcast,
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 15, 20, 25, 30]
        );
    }

    #[test]
    fn test_advance_emits_throttled_ticks_then_expires_once() {
        let mut timer = running(12);
        let events: Vec<_> = (0..15).filter_map(|_| timer.advance()).collect();

        // 11 is neither a multiple of 5 nor inside the final countdown.
        let mut expected: Vec<_> = (1..=10)
            .rev()
            .map(|remaining| TimerEvent::Tick { remaining })
            .collect();
        expected.push(TimerEvent::Expired);

        assert_eq!(events, expected);
        assert_eq!(timer.state(), TimerState::Expired);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut timer = running(5);
        assert_eq!(
            timer.start(5),
            Err(TimerError::NotIdle(TimerState::Running))
        );
    }

    #[test]
    fn test_start_zero_is_rejected() {
        let mut timer = RoundTimer::default();
        assert_eq!(timer.start(0), Err(TimerError::ZeroDuration));
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn test_cancel_only_from_running() {
        let mut idle = RoundTimer::default();
        assert_eq!(
            idle.cancel(),
            Err(TimerError::NotRunning(TimerState::Idle))
        );

        let mut timer = running(3);
        timer.cancel().unwrap();
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert_eq!(
            timer.cancel(),
            Err(TimerError::NotRunning(TimerState::Cancelled))
        );
    }

    #[test]
    fn test_cancelled_timer_never_advances() {
        let mut timer = running(3);
        timer.advance();
        timer.cancel().unwrap();
        assert_eq!(timer.advance(), None);
        assert_eq!(timer.remaining(), 2);
        assert!(timer.state().is_stopped());
    }

    #[test]
    fn test_expired_timer_cannot_restart() {
        let mut timer = running(1);
        assert_eq!(timer.advance(), Some(TimerEvent::Expired));
        assert_eq!(
            timer.start(1),
            Err(TimerError::NotIdle(TimerState::Expired))
        );
        assert_eq!(timer.advance(), None);
    }
}
