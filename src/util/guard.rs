//! Page-level hooks: unload interception, exit notification, notices, reload.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`NavigationGuard`] keeps the user from silently losing their queue slot:
//! while engaged, leaving the page fires the best-effort leave notification
//! and asks the browser for its native "are you sure" prompt.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::rc::Rc;

/// Unload interception callback; returns the confirmation text.
pub type UnloadPrompt = Rc<dyn Fn() -> String>;

/// Host page capabilities the session needs.
pub trait Page {
    /// Show a one-time user-visible notice.
    fn alert(&self, message: &str);
    /// Reload the whole page.
    fn reload(&self);
    /// Install (`Some`) or remove (`None`) the unload interception.
    fn set_unload_prompt(&self, prompt: Option<UnloadPrompt>);
    /// Install (`Some`) or remove (`None`) the handler run when the page is torn down.
    fn set_exit_handler(&self, handler: Option<Rc<dyn Fn()>>);
}

/// Idempotent toggle for the unload interception.
pub struct NavigationGuard {
    page: Rc<dyn Page>,
    prompt: UnloadPrompt,
    engaged: bool,
}

impl NavigationGuard {
    pub fn new(page: Rc<dyn Page>, prompt: UnloadPrompt) -> Self {
        Self { page, prompt, engaged: false }
    }

    #[must_use]
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Block navigation; a no-op when already engaged.
    pub fn engage(&mut self) {
        if self.engaged {
            return;
        }
        self.page.set_unload_prompt(Some(Rc::clone(&self.prompt)));
        self.engaged = true;
    }

    /// Allow navigation; a no-op when not engaged.
    pub fn release(&mut self) {
        if !self.engaged {
            return;
        }
        self.page.set_unload_prompt(None);
        self.engaged = false;
    }
}

/// The current browser window.
#[cfg(feature = "browser")]
#[derive(Default)]
pub struct BrowserPage {
    unload: std::cell::RefCell<Option<wasm_bindgen::closure::Closure<dyn FnMut(web_sys::BeforeUnloadEvent)>>>,
    exit: std::cell::RefCell<Option<wasm_bindgen::closure::Closure<dyn FnMut(web_sys::Event)>>>,
    // The exit handler may remove itself while running; it is parked here
    // instead of being dropped mid-call.
    retired_exit: std::cell::RefCell<Option<wasm_bindgen::closure::Closure<dyn FnMut(web_sys::Event)>>>,
}

#[cfg(feature = "browser")]
const UNLOAD_EVENT: &str = "beforeunload";
#[cfg(feature = "browser")]
const EXIT_EVENT: &str = "pagehide";

#[cfg(feature = "browser")]
fn remove_listener(event: &str, callback: &js_sys::Function) {
    if let Some(window) = web_sys::window()
        && let Err(err) = window.remove_event_listener_with_callback(event, callback)
    {
        log::warn!("waitroom: failed to remove {event} listener: {err:?}");
    }
}

#[cfg(feature = "browser")]
impl Page for BrowserPage {
    fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window()
            && let Err(err) = window.alert_with_message(message)
        {
            log::warn!("waitroom: alert failed: {err:?}");
        }
    }

    fn reload(&self) {
        if let Some(window) = web_sys::window()
            && let Err(err) = window.location().reload()
        {
            log::warn!("waitroom: reload failed: {err:?}");
        }
    }

    fn set_unload_prompt(&self, prompt: Option<UnloadPrompt>) {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::closure::Closure;

        if let Some(previous) = self.unload.borrow_mut().take() {
            remove_listener(UNLOAD_EVENT, previous.as_ref().unchecked_ref());
        }
        let (Some(prompt), Some(window)) = (prompt, web_sys::window()) else {
            return;
        };
        let closure = Closure::wrap(Box::new(move |event: web_sys::BeforeUnloadEvent| {
            let message = prompt();
            event.prevent_default();
            event.set_return_value(&message);
        }) as Box<dyn FnMut(web_sys::BeforeUnloadEvent)>);
        match window.add_event_listener_with_callback(UNLOAD_EVENT, closure.as_ref().unchecked_ref()) {
            Ok(()) => {
                self.unload.replace(Some(closure));
            }
            Err(err) => log::warn!("waitroom: failed to add {UNLOAD_EVENT} listener: {err:?}"),
        }
    }

    fn set_exit_handler(&self, handler: Option<Rc<dyn Fn()>>) {
        use wasm_bindgen::JsCast;
        use wasm_bindgen::closure::Closure;

        if let Some(previous) = self.exit.borrow_mut().take() {
            remove_listener(EXIT_EVENT, previous.as_ref().unchecked_ref());
            self.retired_exit.replace(Some(previous));
        }
        let (Some(handler), Some(window)) = (handler, web_sys::window()) else {
            return;
        };
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| handler()) as Box<dyn FnMut(web_sys::Event)>);
        match window.add_event_listener_with_callback(EXIT_EVENT, closure.as_ref().unchecked_ref()) {
            Ok(()) => {
                self.exit.replace(Some(closure));
            }
            Err(err) => log::warn!("waitroom: failed to add {EXIT_EVENT} listener: {err:?}"),
        }
    }
}
