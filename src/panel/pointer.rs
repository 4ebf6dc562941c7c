//! Document-level pointer tracking for panel drag and resize.
//!
//! An explicit Idle -> Tracking -> Idle machine: engaging attaches the
//! document mousemove/mouseup listeners, releasing detaches them again.
//! The machine refuses to engage twice, which makes drag and resize
//! re-entrant-safe and mutually exclusive.

use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

type MouseCallback = Closure<dyn FnMut(web_sys::MouseEvent)>;

struct Tracking {
    move_cb: MouseCallback,
    up_cb: MouseCallback,
}

#[derive(Clone, Copy)]
pub(crate) struct PointerMachine {
    tracking: StoredValue<Option<Tracking>, LocalStorage>,
}

impl PointerMachine {
    pub(crate) fn new() -> Self {
        Self {
            tracking: StoredValue::new_local(None),
        }
    }

    /// Enter the tracking state from a mousedown. `on_move` receives the
    /// pointer delta from the grab point; `on_release` fires once on
    /// mouseup, after the listeners are detached.
    pub(crate) fn engage(
        &self,
        ev: &web_sys::MouseEvent,
        on_move: impl Fn(f64, f64) + 'static,
        on_release: impl Fn() + 'static,
    ) {
        if self.tracking.with_value(|t| t.is_some()) {
            return;
        }
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let (start_x, start_y) = (ev.client_x() as f64, ev.client_y() as f64);

        let move_cb: MouseCallback = Closure::new(move |e: web_sys::MouseEvent| {
            on_move(e.client_x() as f64 - start_x, e.client_y() as f64 - start_y);
        });

        let machine = *self;
        let up_cb: MouseCallback = Closure::new(move |_e: web_sys::MouseEvent| {
            machine.detach_listeners();
            on_release();
            // This callback is still on the stack; defer dropping it.
            machine.schedule_drop();
        });

        let _ = document
            .add_event_listener_with_callback("mousemove", move_cb.as_ref().unchecked_ref());
        let _ =
            document.add_event_listener_with_callback("mouseup", up_cb.as_ref().unchecked_ref());
        self.tracking.set_value(Some(Tracking { move_cb, up_cb }));
    }

    /// Leave the tracking state immediately (panel teardown). Safe to
    /// call when idle.
    pub(crate) fn abort(&self) {
        self.detach_listeners();
        self.tracking.set_value(None);
    }

    fn detach_listeners(&self) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        self.tracking.with_value(|tracking| {
            if let Some(t) = tracking {
                let _ = document.remove_event_listener_with_callback(
                    "mousemove",
                    t.move_cb.as_ref().unchecked_ref(),
                );
                let _ = document.remove_event_listener_with_callback(
                    "mouseup",
                    t.up_cb.as_ref().unchecked_ref(),
                );
            }
        });
    }

    fn schedule_drop(&self) {
        let machine = *self;
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                Closure::once_into_js(move || machine.tracking.set_value(None))
                    .as_ref()
                    .unchecked_ref(),
                0,
            );
        }
    }
}
