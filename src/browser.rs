//! JavaScript surface of the SDK.
//!
//! SYSTEM CONTEXT
//! ==============
//! The page calls `init(options)` with a plain option object and gets back a
//! `QueueHandle` whose only capability is `disconnect()`. `addListener` and
//! `removeListener` register plain JS functions by identity. Function-valued
//! options (`content` as a function, `handlers`) are read off the object
//! directly because `JSON.stringify` drops them.
//!
//! One `Waitroom` lives per wasm instance, in a thread-local.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::config::{ConfigError, QueueConfig};
use crate::net::api::HttpBackend;
use crate::net::channel::WsTransport;
use crate::net::types::QueueStatus;
use crate::sdk::{InitError, QueueHandle, Waitroom};
use crate::state::registry::{CallbackResult, EventHandler, Listener};
use crate::state::session::{Env, Utilities};
use crate::util::clock::{BrowserClock, BrowserSpawner};
use crate::util::guard::BrowserPage;
use crate::util::overlay::{DomSurface, PopupContent};
use crate::util::storage::WebStorage;

thread_local! {
    static WAITROOM: RefCell<Waitroom> = RefCell::new(Waitroom::new());
    static JS_LISTENERS: RefCell<Vec<(js_sys::Function, Listener)>> = const { RefCell::new(Vec::new()) };
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("waitroom: logger already installed");
    }
}

/// Handle returned by `init`.
#[wasm_bindgen(js_name = "QueueHandle")]
pub struct JsQueueHandle(QueueHandle);

#[wasm_bindgen(js_class = "QueueHandle")]
impl JsQueueHandle {
    pub fn disconnect(&self) {
        self.0.disconnect();
        WAITROOM.with(|waitroom| prune_listeners(&waitroom.borrow()));
    }
}

/// Popup/navigation controls passed to custom event handlers.
#[wasm_bindgen(js_name = "Utilities")]
pub struct JsUtilities(Utilities);

#[wasm_bindgen(js_class = "Utilities")]
impl JsUtilities {
    #[wasm_bindgen(js_name = "createPopup")]
    pub fn create_popup(&self, html: &str) {
        self.0.create_popup(html);
    }

    #[wasm_bindgen(js_name = "removePopup")]
    pub fn remove_popup(&self) {
        self.0.remove_popup();
    }

    #[wasm_bindgen(js_name = "preventNavigation")]
    pub fn prevent_navigation(&self) {
        self.0.prevent_navigation();
    }

    #[wasm_bindgen(js_name = "allowNavigation")]
    pub fn allow_navigation(&self) {
        self.0.allow_navigation();
    }
}

/// Start a queue session.
///
/// # Errors
///
/// Throws on missing or invalid configuration, on a runtime without
/// `WebSocket`, or while another session is still live.
#[wasm_bindgen]
pub fn init(options: JsValue) -> Result<JsQueueHandle, JsError> {
    let started = ensure_supported()
        .and_then(|()| read_config(&options))
        .and_then(|config| {
            let env = browser_env(&config);
            WAITROOM.with(|waitroom| waitroom.borrow_mut().init(config, env))
        });
    WAITROOM.with(|waitroom| prune_listeners(&waitroom.borrow()));
    match started {
        Ok(handle) => Ok(JsQueueHandle(handle)),
        Err(err) => {
            log::error!("waitroom: init failed: {err}");
            Err(JsError::new(&err.to_string()))
        }
    }
}

/// Register `listener` for every applied status.
#[wasm_bindgen(js_name = "addListener")]
pub fn add_listener(listener: js_sys::Function) {
    let callback = listener.clone();
    let wrapped: Listener = Rc::new(move |status: &QueueStatus| -> CallbackResult {
        let value = to_js(&serde_json::to_value(status).map_err(|e| e.to_string())?)?;
        callback.call1(&JsValue::NULL, &value).map(drop).map_err(describe)
    });
    WAITROOM.with(|waitroom| {
        let mut waitroom = waitroom.borrow_mut();
        waitroom.add_listener(Rc::clone(&wrapped));
        prune_listeners(&waitroom);
    });
    JS_LISTENERS.with(|listeners| listeners.borrow_mut().push((listener, wrapped)));
}

/// Remove every registration of `listener`.
#[wasm_bindgen(js_name = "removeListener")]
pub fn remove_listener(listener: &js_sys::Function) {
    let matched: Vec<Listener> = JS_LISTENERS.with(|listeners| {
        let mut listeners = listeners.borrow_mut();
        let (matched, kept): (Vec<_>, Vec<_>) = listeners
            .drain(..)
            .partition(|(function, _)| js_sys::Object::is(function, listener));
        *listeners = kept;
        matched.into_iter().map(|(_, wrapped)| wrapped).collect()
    });
    WAITROOM.with(|waitroom| {
        let mut waitroom = waitroom.borrow_mut();
        for wrapped in &matched {
            waitroom.remove_listener(wrapped);
        }
        prune_listeners(&waitroom);
    });
}

/// Forget JS functions whose registration ended with a closed session.
/// Sessions closed by page exit or a fatal channel error are pruned on the
/// next call into this module.
fn prune_listeners(waitroom: &Waitroom) {
    JS_LISTENERS.with(|listeners| listeners.borrow_mut().retain(|(_, wrapped)| waitroom.holds(wrapped)));
}

fn ensure_supported() -> Result<(), InitError> {
    let window = web_sys::window().ok_or_else(|| InitError::Unsupported("no window".to_owned()))?;
    match js_sys::Reflect::has(&window, &JsValue::from_str("WebSocket")) {
        Ok(true) => Ok(()),
        Ok(false) => Err(InitError::Unsupported("WebSocket is not available".to_owned())),
        Err(err) => Err(InitError::Unsupported(describe(err))),
    }
}

fn read_config(options: &JsValue) -> Result<QueueConfig, InitError> {
    if !options.is_object() {
        return Err(ConfigError::Parse("options must be an object".to_owned()).into());
    }
    let text: String = js_sys::JSON::stringify(options)
        .map_err(|e| ConfigError::Parse(describe(e)))?
        .into();
    let mut config = QueueConfig::from_json(&text)?;
    if let Some(window) = web_sys::window()
        && let Ok(origin) = window.location().origin()
    {
        config.resolve_against(&origin);
    }

    if let Some(content) = field(options, "content")
        && content.is_function()
    {
        let build: js_sys::Function = content.unchecked_into();
        config.content = Some(PopupContent::Dynamic(Rc::new(move |position: u64| render_content(&build, position))));
    }
    if let Some(handlers) = field(options, "handlers").filter(JsValue::is_object) {
        for entry in js_sys::Object::entries(handlers.unchecked_ref::<js_sys::Object>()).iter() {
            let pair: js_sys::Array = entry.unchecked_into();
            let (Some(event), Ok(function)) = (pair.get(0).as_string(), pair.get(1).dyn_into::<js_sys::Function>())
            else {
                continue;
            };
            config.handlers.insert(event, js_handler(function));
        }
    }
    Ok(config)
}

fn browser_env(config: &QueueConfig) -> Env {
    Env {
        storage: Rc::new(WebStorage::new(config.storage_area)),
        backend: Rc::new(HttpBackend::new(config.backend_url.clone())),
        transport: Rc::new(WsTransport),
        surface: Rc::new(DomSurface::default()),
        page: Rc::new(BrowserPage::default()),
        clock: Rc::new(BrowserClock),
        spawner: Rc::new(BrowserSpawner),
    }
}

fn js_handler(function: js_sys::Function) -> EventHandler {
    Rc::new(move |data: &Value, utils: &Utilities| -> CallbackResult {
        let data = to_js(data)?;
        let utils: JsValue = JsUtilities(utils.clone()).into();
        function.call2(&JsValue::NULL, &data, &utils).map(drop).map_err(describe)
    })
}

#[allow(clippy::cast_precision_loss)]
fn render_content(build: &js_sys::Function, position: u64) -> String {
    match build.call1(&JsValue::NULL, &JsValue::from_f64(position as f64)) {
        Ok(html) => html.as_string().unwrap_or_default(),
        Err(err) => {
            log::warn!("waitroom: content function failed: {}", describe(err));
            String::new()
        }
    }
}

fn field(object: &JsValue, name: &str) -> Option<JsValue> {
    js_sys::Reflect::get(object, &JsValue::from_str(name))
        .into_iter()
        .find(|v| !v.is_undefined() && !v.is_null())
}

fn to_js(value: &Value) -> Result<JsValue, String> {
    js_sys::JSON::parse(&value.to_string()).map_err(describe)
}

fn describe(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
