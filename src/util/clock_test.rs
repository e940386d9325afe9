use super::*;
use std::cell::Cell;
use std::rc::Rc;

#[test]
fn cancel_runs_cancellation_once() {
    let hits = Rc::new(Cell::new(0));
    let hits_cb = Rc::clone(&hits);
    let handle = TimerHandle::new(move || hits_cb.set(hits_cb.get() + 1));
    handle.cancel();
    assert_eq!(hits.get(), 1);
}

#[test]
fn drop_cancels_unfired_handle() {
    let hits = Rc::new(Cell::new(0));
    let hits_cb = Rc::clone(&hits);
    {
        let _handle = TimerHandle::new(move || hits_cb.set(hits_cb.get() + 1));
    }
    assert_eq!(hits.get(), 1);
}

#[test]
fn debug_reports_armed_state() {
    let handle = TimerHandle::new(|| {});
    assert!(format!("{handle:?}").contains("armed: true"));
}
