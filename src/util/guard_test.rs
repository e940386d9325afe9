use super::*;
use std::cell::{Cell, RefCell};

#[derive(Default)]
struct RecordingPage {
    prompt: RefCell<Option<UnloadPrompt>>,
    installs: Cell<usize>,
    removals: Cell<usize>,
}

impl Page for RecordingPage {
    fn alert(&self, _message: &str) {}

    fn reload(&self) {}

    fn set_unload_prompt(&self, prompt: Option<UnloadPrompt>) {
        match &prompt {
            Some(_) => self.installs.set(self.installs.get() + 1),
            None => self.removals.set(self.removals.get() + 1),
        }
        self.prompt.replace(prompt);
    }

    fn set_exit_handler(&self, _handler: Option<Rc<dyn Fn()>>) {}
}

fn guard(page: &Rc<RecordingPage>) -> NavigationGuard {
    NavigationGuard::new(page.clone(), Rc::new(|| "stay?".to_owned()))
}

#[test]
fn engage_installs_prompt_once() {
    let page = Rc::new(RecordingPage::default());
    let mut guard = guard(&page);

    guard.engage();
    guard.engage();

    assert!(guard.is_engaged());
    assert_eq!(page.installs.get(), 1);
    let prompt = page.prompt.borrow().clone().expect("prompt installed");
    assert_eq!(prompt(), "stay?");
}

#[test]
fn release_is_idempotent() {
    let page = Rc::new(RecordingPage::default());
    let mut guard = guard(&page);

    guard.release();
    assert_eq!(page.removals.get(), 0);

    guard.engage();
    guard.release();
    guard.release();

    assert!(!guard.is_engaged());
    assert_eq!(page.removals.get(), 1);
    assert!(page.prompt.borrow().is_none());
}

#[test]
fn reengage_after_release_installs_again() {
    let page = Rc::new(RecordingPage::default());
    let mut guard = guard(&page);

    guard.engage();
    guard.release();
    guard.engage();

    assert_eq!(page.installs.get(), 2);
    assert!(page.prompt.borrow().is_some());
}
