//! DOM event listeners that can be unbound again.

use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{AddEventListenerOptions, Event, EventTarget};

struct Listener {
    target: EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// Owns the closures behind a group of listeners so they can be removed.
#[derive(Default)]
pub struct Listeners {
    bound: Vec<Listener>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    pub fn add<E, F>(&mut self, target: &EventTarget, event: &'static str, handler: F) -> Result<(), JsValue>
    where
        E: JsCast,
        F: FnMut(E) + 'static,
    {
        let closure = wrap(handler);
        target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.keep(target, event, closure);
        Ok(())
    }

    /// Like [`Listeners::add`], but lets the handler call `prevent_default`.
    pub fn add_active<E, F>(&mut self, target: &EventTarget, event: &'static str, handler: F) -> Result<(), JsValue>
    where
        E: JsCast,
        F: FnMut(E) + 'static,
    {
        let closure = wrap(handler);
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        target.add_event_listener_with_callback_and_add_event_listener_options(
            event,
            closure.as_ref().unchecked_ref(),
            &options,
        )?;
        self.keep(target, event, closure);
        Ok(())
    }

    fn keep(&mut self, target: &EventTarget, event: &'static str, closure: Closure<dyn FnMut(Event)>) {
        self.bound.push(Listener {
            target: target.clone(),
            event,
            closure,
        });
    }

    /// Unbind everything; the closures are dropped with it.
    pub fn remove_all(&mut self) {
        for l in self.bound.drain(..) {
            if let Err(e) = l
                .target
                .remove_event_listener_with_callback(l.event, l.closure.as_ref().unchecked_ref())
            {
                log::warn!("removing {} listener failed: {:?}", l.event, e);
            }
        }
    }
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.remove_all();
    }
}

fn wrap<E, F>(mut handler: F) -> Closure<dyn FnMut(Event)>
where
    E: JsCast,
    F: FnMut(E) + 'static,
{
    Closure::wrap(Box::new(move |e: Event| handler(e.unchecked_into::<E>())) as Box<dyn FnMut(Event)>)
}
