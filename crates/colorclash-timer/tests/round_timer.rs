//! Integration tests for the round timer on the Tokio clock.
//!
//! Uses `start_paused = true` so the runtime auto-advances time whenever
//! every task is idle; a 60-second round finishes instantly.

use std::time::Duration;

use colorclash_timer::{RoundTimer, TimerConfig, TimerEvent, TimerState};
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

/// Collects every event until the timer expires.
async fn drain(timer: &mut RoundTimer) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    loop {
        let event = timer.wait_for_tick().await;
        events.push(event);
        if event == TimerEvent::Expired {
            return events;
        }
    }
}

// =========================================================================
// Cadence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_event_of_a_full_round_is_at_55() {
    let mut timer = RoundTimer::default();
    let started = Instant::now();
    timer.start(60).unwrap();

    let event = timer.wait_for_tick().await;

    assert_eq!(event, TimerEvent::Tick { remaining: 55 });
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_full_round_event_sequence() {
    let mut timer = RoundTimer::default();
    let started = Instant::now();
    timer.start(60).unwrap();

    let events = drain(&mut timer).await;

    let mut expected: Vec<TimerEvent> = [55, 50, 45, 40, 35, 30, 25, 20, 15]
        .into_iter()
        .chain((1..=10).rev())
        .map(|remaining| TimerEvent::Tick { remaining })
        .collect();
    expected.push(TimerEvent::Expired);

    assert_eq!(events, expected);
    assert_eq!(started.elapsed(), Duration::from_secs(60));
    assert_eq!(timer.state(), TimerState::Expired);
}

#[tokio::test(start_paused = true)]
async fn test_custom_period_and_stride() {
    let mut timer = RoundTimer::new(TimerConfig {
        tick_period: Duration::from_millis(100),
        broadcast_every: 0,
        countdown_from: 2,
    });
    let started = Instant::now();
    timer.start(6).unwrap();

    let events = drain(&mut timer).await;

    assert_eq!(
        events,
        vec![
            TimerEvent::Tick { remaining: 2 },
            TimerEvent::Tick { remaining: 1 },
            TimerEvent::Expired,
        ]
    );
    assert_eq!(started.elapsed(), Duration::from_millis(600));
}

// =========================================================================
// Idle and cancelled timers pend forever
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_timer_never_fires() {
    let mut timer = RoundTimer::default();
    let result =
        tokio::time::timeout(Duration::from_secs(3600), timer.wait_for_tick())
            .await;
    assert!(result.is_err(), "an idle timer must not produce events");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let mut timer = RoundTimer::default();
    timer.start(60).unwrap();
    assert_eq!(
        timer.wait_for_tick().await,
        TimerEvent::Tick { remaining: 55 }
    );

    timer.cancel().unwrap();

    let result =
        tokio::time::timeout(Duration::from_secs(120), timer.wait_for_tick())
            .await;
    assert!(result.is_err(), "no tick or expiry after cancel");
    assert_eq!(timer.remaining(), 55);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_wait_future_loses_no_steps() {
    let mut timer = RoundTimer::default();
    timer.start(20).unwrap();

    // Abandon the wait half-way through a step, as a select! would.
    let _ = tokio::time::timeout(
        Duration::from_millis(500),
        timer.wait_for_tick(),
    )
    .await;
    assert_eq!(timer.remaining(), 20);

    assert_eq!(
        timer.wait_for_tick().await,
        TimerEvent::Tick { remaining: 15 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_expiry_is_emitted_exactly_once() {
    let mut timer = RoundTimer::default();
    timer.start(3).unwrap();

    let events = drain(&mut timer).await;
    assert_eq!(events.last(), Some(&TimerEvent::Expired));
    assert_eq!(
        events.iter().filter(|e| **e == TimerEvent::Expired).count(),
        1
    );

    let again =
        tokio::time::timeout(Duration::from_secs(10), timer.wait_for_tick())
            .await;
    assert!(again.is_err());
}
