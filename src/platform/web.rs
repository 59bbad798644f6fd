//! Browser implementations: window key listeners and `<img>` loading

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlImageElement, KeyboardEvent, Window};

use super::{KeyEventSource, KeyHandler};
use crate::error::LoadError;
use crate::sim::ImageLoader;

type KeyListener = Closure<dyn FnMut(KeyboardEvent)>;

/// `keydown`/`keyup` listeners on the global window
pub struct WindowKeySource {
    window: Window,
    listeners: Option<(KeyListener, KeyListener)>,
}

impl WindowKeySource {
    /// `None` outside a browsing context
    pub fn new() -> Option<Self> {
        web_sys::window().map(|window| Self {
            window,
            listeners: None,
        })
    }
}

impl KeyEventSource for WindowKeySource {
    fn attach(&mut self, handler: KeyHandler) {
        self.detach();

        let handler = Rc::new(RefCell::new(handler));
        let listener = |is_down: bool| {
            let handler = handler.clone();
            Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if let Ok(mut handler) = handler.try_borrow_mut() {
                    let handler: &mut KeyHandler = &mut handler;
                    handler(&event.key(), is_down);
                }
            })
        };
        let down = listener(true);
        let up = listener(false);

        let _ = self
            .window
            .add_event_listener_with_callback("keydown", down.as_ref().unchecked_ref());
        let _ = self
            .window
            .add_event_listener_with_callback("keyup", up.as_ref().unchecked_ref());
        self.listeners = Some((down, up));
    }

    fn detach(&mut self) {
        if let Some((down, up)) = self.listeners.take() {
            let _ = self
                .window
                .remove_event_listener_with_callback("keydown", down.as_ref().unchecked_ref());
            let _ = self
                .window
                .remove_event_listener_with_callback("keyup", up.as_ref().unchecked_ref());
        }
    }
}

impl Drop for WindowKeySource {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Loads images through `HtmlImageElement`
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlImageLoader;

impl ImageLoader for HtmlImageLoader {
    type Handle = HtmlImageElement;

    fn load(&self, source: &str) -> impl Future<Output = Result<HtmlImageElement, LoadError>> {
        let source = source.to_string();
        async move {
            let image = HtmlImageElement::new()
                .map_err(|e| LoadError::new(&source, format!("{:?}", e)))?;

            let promise = js_sys::Promise::new(&mut |resolve, reject| {
                image.set_onload(Some(&resolve));
                image.set_onerror(Some(&reject));
            });
            image.set_src(&source);

            let loaded = JsFuture::from(promise).await;
            image.set_onload(None);
            image.set_onerror(None);
            loaded.map_err(|_| LoadError::new(&source, "not found or not decodable"))?;

            Ok(image)
        }
    }
}

/// Milliseconds on the same clock as `requestAnimationFrame` timestamps
pub fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Open a beacon link in a new tab
pub fn open_link(url: &str) {
    if let Some(window) = web_sys::window() {
        if window.open_with_url_and_target(url, "_blank").is_err() {
            log::warn!("Could not open {}", url);
        }
    }
}
