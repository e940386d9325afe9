//! Full-viewport blocking overlay shown while WAITING.
//!
//! DESIGN
//! ======
//! [`BlockingUi`] owns the "at most one overlay" rule; the [`Surface`] only
//! knows how to attach and detach a node. Every render unmounts the previous
//! node first, so repeated renders never stack overlays.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use std::rc::Rc;

use crate::util::locale::{Locale, default_popup_html};

/// DOM id of the overlay node.
pub const OVERLAY_ID: &str = "waitroom-overlay";

/// Styling used when no override is configured.
pub const DEFAULT_STYLE: &str = "position:fixed;inset:0;z-index:2147483647;display:flex;\
align-items:center;justify-content:center;text-align:center;background:rgba(17,17,17,0.72);\
color:#fff;font-family:system-ui,sans-serif;";

/// Attach/detach point for the overlay node.
pub trait Surface {
    /// Create one overlay node with `style` and inner `html` and attach it.
    ///
    /// # Errors
    ///
    /// Returns a description when the host document refuses the node.
    fn mount(&self, html: &str, style: &str) -> Result<(), String>;
    /// Detach the overlay node.
    fn unmount(&self);
}

/// Overlay markup: fixed text or rebuilt from the current position.
#[derive(Clone)]
pub enum PopupContent {
    Static(String),
    Dynamic(Rc<dyn Fn(u64) -> String>),
}

impl PopupContent {
    /// Markup for `position`. Dynamic content is evaluated fresh each call.
    #[must_use]
    pub fn render(&self, position: u64) -> String {
        match self {
            Self::Static(html) => html.clone(),
            Self::Dynamic(build) => build(position),
        }
    }
}

impl std::fmt::Debug for PopupContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(html) => f.debug_tuple("Static").field(html).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Controller enforcing a single overlay node.
pub struct BlockingUi {
    surface: Rc<dyn Surface>,
    content: Option<PopupContent>,
    style: Option<String>,
    locale: Locale,
    mounted: bool,
}

impl BlockingUi {
    pub fn new(surface: Rc<dyn Surface>, content: Option<PopupContent>, style: Option<String>, locale: Locale) -> Self {
        Self { surface, content, style, locale, mounted: false }
    }

    /// Whether an overlay node is currently attached.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Replace any overlay with one showing `html`.
    ///
    /// `style` falls back to the configured override, then [`DEFAULT_STYLE`].
    pub fn render(&mut self, html: &str, style: Option<&str>) {
        self.clear();
        let style = style
            .or(self.style.as_deref())
            .unwrap_or(DEFAULT_STYLE);
        match self.surface.mount(html, style) {
            Ok(()) => self.mounted = true,
            Err(err) => log::warn!("waitroom: failed to render overlay: {err}"),
        }
    }

    /// Render the configured (or default) content for `position`.
    pub fn render_position(&mut self, position: u64) {
        let html = match &self.content {
            Some(content) => content.render(position),
            None => default_popup_html(self.locale, position),
        };
        self.render(&html, None);
    }

    /// Remove the overlay; a no-op when none is attached.
    pub fn clear(&mut self) {
        if self.mounted {
            self.surface.unmount();
            self.mounted = false;
        }
    }
}

/// Overlay attached to `document.body`.
#[cfg(feature = "browser")]
#[derive(Debug, Default)]
pub struct DomSurface {
    node: std::cell::RefCell<Option<web_sys::Element>>,
}

#[cfg(feature = "browser")]
impl Surface for DomSurface {
    fn mount(&self, html: &str, style: &str) -> Result<(), String> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| "no document".to_owned())?;
        let body = document.body().ok_or_else(|| "no document body".to_owned())?;
        let node = document
            .create_element("div")
            .map_err(|e| format!("{e:?}"))?;
        node.set_id(OVERLAY_ID);
        node.set_attribute("style", style)
            .map_err(|e| format!("{e:?}"))?;
        node.set_inner_html(html);
        body.append_child(&node).map_err(|e| format!("{e:?}"))?;
        self.node.replace(Some(node));
        Ok(())
    }

    fn unmount(&self) {
        if let Some(node) = self.node.borrow_mut().take() {
            node.remove();
        }
    }
}
