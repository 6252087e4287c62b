// Integration tests for recorded-time accounting

use sound_recorder::{Clock, ManualClock, TimingAccumulator, TimingEvent};
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_accumulator_sums_intervals_across_pause() {
    let clock = ManualClock::new();
    let t0 = clock.origin();
    let mut timing = TimingAccumulator::new();

    timing.on_event(TimingEvent::Start, t0);
    assert_eq!(timing.on_event(TimingEvent::Pause, t0 + ms(5000)), Some(ms(5000)));
    assert_eq!(timing.on_event(TimingEvent::Resume, t0 + ms(8000)), None);
    assert_eq!(timing.on_event(TimingEvent::Stop, t0 + ms(9000)), Some(ms(1000)));

    assert_eq!(timing.closed(), ms(6000));
    assert!(!timing.is_running());
}

#[test]
fn test_total_includes_open_interval() {
    let t0 = ManualClock::new().origin();
    let mut timing = TimingAccumulator::new();

    timing.on_event(TimingEvent::Start, t0);
    timing.on_event(TimingEvent::Pause, t0 + ms(2000));
    timing.on_event(TimingEvent::Resume, t0 + ms(3000));

    assert_eq!(timing.total_at(t0 + ms(3500)), ms(2500));
    assert_eq!(timing.closed(), ms(2000));
}

#[test]
fn test_duplicate_events_do_not_double_count() {
    let t0 = ManualClock::new().origin();
    let mut timing = TimingAccumulator::new();

    timing.on_event(TimingEvent::Start, t0);
    // Resume while running keeps the original start
    timing.on_event(TimingEvent::Resume, t0 + ms(400));
    timing.on_event(TimingEvent::Pause, t0 + ms(1000));
    // Pause while paused closes nothing
    assert_eq!(timing.on_event(TimingEvent::Pause, t0 + ms(1500)), None);

    assert_eq!(timing.closed(), ms(1000));
}

#[test]
fn test_timestamp_before_interval_start_counts_as_zero() {
    let t0 = ManualClock::new().origin();
    let mut timing = TimingAccumulator::new();

    timing.on_event(TimingEvent::Start, t0 + ms(1000));
    assert_eq!(timing.on_event(TimingEvent::Stop, t0), Some(Duration::ZERO));
    assert_eq!(timing.closed(), Duration::ZERO);
}

#[test]
fn test_start_resets_previous_total() {
    let t0 = ManualClock::new().origin();
    let mut timing = TimingAccumulator::new();

    timing.on_event(TimingEvent::Start, t0);
    timing.on_event(TimingEvent::Stop, t0 + ms(3000));
    timing.on_event(TimingEvent::Start, t0 + ms(4000));

    assert_eq!(timing.total_at(t0 + ms(4100)), ms(100));

    timing.reset();
    assert_eq!(timing.total_at(t0 + ms(9000)), Duration::ZERO);
}

#[test]
fn test_manual_clock_never_moves_backwards() {
    let clock = ManualClock::new();

    clock.advance(ms(500));
    clock.set_elapsed(ms(200));
    assert_eq!(clock.now() - clock.origin(), ms(500));

    clock.set_elapsed(ms(900));
    assert_eq!(clock.now() - clock.origin(), ms(900));

    // Clones share the same time
    let other = clock.clone();
    other.advance(ms(100));
    assert_eq!(clock.now(), other.now());
}
