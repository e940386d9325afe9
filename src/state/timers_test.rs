use super::*;
use crate::fakes::FakeClock;
use std::cell::Cell;

fn counter() -> (Rc<Cell<u32>>, Box<dyn FnMut()>) {
    let hits = Rc::new(Cell::new(0));
    let sink = Rc::clone(&hits);
    (hits, Box::new(move || sink.set(sink.get() + 1)))
}

#[test]
fn restarting_a_kind_cancels_the_previous_timer() {
    let clock = Rc::new(FakeClock::default());
    let mut timers = Timers::new(clock.clone());
    let (first, tick_first) = counter();
    let (second, tick_second) = counter();

    timers.start_interval(TimerKind::Reannounce, 1000, tick_first);
    timers.start_interval(TimerKind::Reannounce, 2000, tick_second);
    clock.advance(4000);

    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 2);
    assert_eq!(timers.len(), 1);
    assert_eq!(timers.period(TimerKind::Reannounce), Some(2000));
}

#[test]
fn stop_reports_whether_anything_ran() {
    let clock = Rc::new(FakeClock::default());
    let mut timers = Timers::new(clock.clone());
    let (hits, tick) = counter();

    assert!(!timers.stop(TimerKind::Heartbeat));
    timers.start_interval(TimerKind::Heartbeat, 500, tick);
    assert!(timers.stop(TimerKind::Heartbeat));
    clock.advance(5000);

    assert_eq!(hits.get(), 0);
    assert!(!timers.is_running(TimerKind::Heartbeat));
}

#[test]
fn stop_all_cancels_every_kind() {
    let clock = Rc::new(FakeClock::default());
    let mut timers = Timers::new(clock.clone());
    let (ticks, tick) = counter();
    let fired = Rc::new(Cell::new(false));
    let fired_cb = Rc::clone(&fired);

    timers.start_interval(TimerKind::Heartbeat, 100, tick);
    timers.start_reconnect(100, Box::new(move || fired_cb.set(true)));
    assert_eq!(clock.active_count(), 2);

    timers.stop_all();
    clock.advance(1000);

    assert!(timers.is_empty());
    assert_eq!(clock.active_count(), 0);
    assert_eq!(ticks.get(), 0);
    assert!(!fired.get());
}

#[test]
fn reconnect_fires_once() {
    let clock = Rc::new(FakeClock::default());
    let mut timers = Timers::new(clock.clone());
    let fired = Rc::new(Cell::new(0));
    let fired_cb = Rc::clone(&fired);

    timers.start_reconnect(250, Box::new(move || fired_cb.set(fired_cb.get() + 1)));
    assert_eq!(timers.reconnect_delay(), Some(250));
    clock.advance(249);
    assert_eq!(fired.get(), 0);
    clock.advance(10_000);
    assert_eq!(fired.get(), 1);
}
