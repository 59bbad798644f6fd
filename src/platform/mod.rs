//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Key events (`KeyEventSource`)
//! - Image loading (`web::HtmlImageLoader` on wasm32)
//! - Frame timestamps

#[cfg(target_arch = "wasm32")]
pub mod web;

use std::cell::RefCell;
use std::rc::Rc;

use crate::sim::{InputState, MovementSample};

/// Receives `(key name, is_down)` for every raw key transition
pub type KeyHandler = Box<dyn FnMut(&str, bool)>;

/// Something that emits key transitions (a browser window, a test script)
pub trait KeyEventSource {
    /// Start delivering transitions to `handler`, replacing any previous one
    fn attach(&mut self, handler: KeyHandler);
    /// Stop delivering transitions
    fn detach(&mut self);
}

/// Key source driven by hand, for native runs and tests.
///
/// Clones share the same attachment, like listeners on one event target.
#[derive(Clone, Default)]
pub struct ManualKeySource {
    handler: Rc<RefCell<Option<KeyHandler>>>,
}

impl ManualKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a transition. Returns false if nothing is attached.
    pub fn emit(&self, key: &str, is_down: bool) -> bool {
        let Ok(mut slot) = self.handler.try_borrow_mut() else {
            log::warn!("Dropped re-entrant key event `{}`", key);
            return false;
        };
        match slot.as_mut() {
            Some(handler) => {
                handler(key, is_down);
                true
            }
            None => false,
        }
    }

    pub fn press(&self, key: &str) -> bool {
        self.emit(key, true)
    }

    pub fn release(&self, key: &str) -> bool {
        self.emit(key, false)
    }

    pub fn is_attached(&self) -> bool {
        self.handler.borrow().is_some()
    }
}

impl KeyEventSource for ManualKeySource {
    fn attach(&mut self, handler: KeyHandler) {
        *self.handler.borrow_mut() = Some(handler);
    }

    fn detach(&mut self) {
        *self.handler.borrow_mut() = None;
    }
}

/// An [`InputState`] wired to a key source for its whole lifetime.
///
/// Registers on construction and deregisters on drop.
pub struct InputBinding<S: KeyEventSource> {
    input: Rc<RefCell<InputState>>,
    source: S,
}

impl<S: KeyEventSource> InputBinding<S> {
    pub fn new(mut source: S, input: InputState) -> Self {
        let input = Rc::new(RefCell::new(input));
        let target = Rc::downgrade(&input);
        source.attach(Box::new(move |key: &str, is_down: bool| {
            let Some(input) = target.upgrade() else {
                return;
            };
            match input.try_borrow_mut() {
                Ok(mut input) => {
                    input.record_key_transition(key, is_down);
                }
                Err(_) => log::warn!("Input busy, dropped key event `{}`", key),
            }
        }));
        Self { input, source }
    }

    pub fn sample_movement(&self) -> MovementSample {
        self.input.borrow().sample_movement()
    }

    pub fn enable(&self) {
        self.input.borrow_mut().enable();
    }

    pub fn disable(&self) {
        self.input.borrow_mut().disable();
    }
}

impl<S: KeyEventSource> Drop for InputBinding<S> {
    fn drop(&mut self) {
        self.source.detach();
    }
}
