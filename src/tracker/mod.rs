//! Visibility tracker: maps live scroll state to the heading currently
//! being read.
//!
//! Primary strategy observes the heading elements against a thin band
//! near the viewport top; when the observer cannot be built, a scroll
//! listener recomputes the active heading from recorded offsets. One
//! strategy per session, chosen once at startup. Updates coalesce to one
//! per animation frame and are idempotent for an unchanged position.

use crate::session::TocSession;
use crate::toc;
use leptos::ev;
use leptos::prelude::*;
use leptos_dom::helpers::{window_event_listener, WindowListenerHandle};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

/// A heading is "passed" once it crosses into the strip between 100px
/// from the top and 80% above the bottom of the viewport.
const OBSERVER_ROOT_MARGIN: &str = "-100px 0px -80% 0px";

type ObserverCallback = Closure<dyn FnMut(js_sys::Array, web_sys::IntersectionObserver)>;

pub(crate) struct VisibilityTracker {
    observer: Option<web_sys::IntersectionObserver>,
    _observer_cb: Option<ObserverCallback>,
    scroll_handle: Option<WindowListenerHandle>,
}

impl VisibilityTracker {
    pub(crate) fn start(session: TocSession) -> Self {
        let tracker = match build_observer(session) {
            Some((observer, cb)) => {
                session.with_elements(|elements| {
                    for el in elements {
                        observer.observe(el);
                    }
                });
                Self {
                    observer: Some(observer),
                    _observer_cb: Some(cb),
                    scroll_handle: None,
                }
            }
            None => Self {
                observer: None,
                _observer_cb: None,
                scroll_handle: Some(build_scroll_fallback(session)),
            },
        };

        // Seed the highlight before any scroll event fires.
        let scroll_top = web_sys::window()
            .and_then(|w| w.scroll_y().ok())
            .unwrap_or(0.0);
        let initial = session
            .forest
            .with_untracked(|f| toc::fallback_active_index(f, scroll_top));
        session.set_active_heading(initial);

        tracker
    }
}

impl Drop for VisibilityTracker {
    fn drop(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        if let Some(handle) = self.scroll_handle.take() {
            handle.remove();
        }
    }
}

fn build_observer(session: TocSession) -> Option<(web_sys::IntersectionObserver, ObserverCallback)> {
    let pending = Rc::new(Cell::new(false));
    let latest = Rc::new(Cell::new(None::<usize>));

    let cb: ObserverCallback = Closure::new(
        move |entries: js_sys::Array, _obs: web_sys::IntersectionObserver| {
            for entry in entries.iter() {
                let entry: web_sys::IntersectionObserverEntry = entry.unchecked_into();
                if !entry.is_intersecting() {
                    continue;
                }
                let target = entry.target();
                let target_node: &web_sys::Node = target.as_ref();
                let index = session.with_elements(|elements| {
                    elements
                        .iter()
                        .position(|el| el.is_same_node(Some(target_node)))
                });
                if let Some(index) = index {
                    latest.set(Some(index));
                }
            }

            if latest.get().is_some() && !pending.replace(true) {
                let pending = Rc::clone(&pending);
                let latest = Rc::clone(&latest);
                request_frame(move || {
                    pending.set(false);
                    if let Some(index) = latest.take() {
                        session.set_active_heading(Some(index));
                    }
                });
            }
        },
    );

    let init = web_sys::IntersectionObserverInit::new();
    init.set_root_margin(OBSERVER_ROOT_MARGIN);
    init.set_threshold(&JsValue::from(0.0));

    let observer =
        web_sys::IntersectionObserver::new_with_options(cb.as_ref().unchecked_ref(), &init).ok()?;
    Some((observer, cb))
}

fn build_scroll_fallback(session: TocSession) -> WindowListenerHandle {
    let pending = Rc::new(Cell::new(false));

    window_event_listener(ev::scroll, move |_ev: web_sys::Event| {
        // Coalesce bursts of scroll events into one update per frame.
        if pending.replace(true) {
            return;
        }
        let pending = Rc::clone(&pending);
        request_frame(move || {
            pending.set(false);
            let scroll_top = web_sys::window()
                .and_then(|w| w.scroll_y().ok())
                .unwrap_or(0.0);
            let index = session
                .forest
                .with_untracked(|f| toc::fallback_active_index(f, scroll_top));
            session.set_active_heading(index);
        });
    })
}

fn request_frame(f: impl FnOnce() + 'static) {
    if let Some(window) = web_sys::window() {
        let _ = window.request_animation_frame(
            Closure::once_into_js(move |_: f64| f())
                .as_ref()
                .unchecked_ref(),
        );
    }
}
