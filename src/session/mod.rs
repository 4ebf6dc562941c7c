//! The per-document TOC session: one explicit object owning all mutable
//! state (panel phase, forest, element side table, tracker, timers),
//! passed around via Leptos context instead of ambient singletons.

use crate::models::{PanelPosition, TocNode, TocSettings};
use crate::storage;
use crate::toc;
use crate::toc::extract;
use crate::tracker::VisibilityTracker;
use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

/// How long the "no headings" shell stays up before auto-dismissing.
const EMPTY_DISMISS_MS: i32 = 3_000;

/// How long a hover preview holds before the scroll position is restored.
const PREVIEW_RESTORE_MS: i32 = 3_000;

const TOAST_MS: i32 = 3_000;

const DEFAULT_PANEL_HEIGHT: f64 = 600.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum PanelPhase {
    #[default]
    Hidden,
    Loading,
    /// Forest rendered, listeners bound.
    Active,
    /// Zero headings survived filtering; transient, auto-dismisses.
    Empty,
    /// Extraction fault; sticky until explicitly closed.
    Error,
}

/// Phase reached once a generate request resolves. Extraction failures
/// and the empty forest are user-visible states, not exceptions.
pub(crate) fn phase_after_generate(outcome: &Result<usize, String>) -> PanelPhase {
    match outcome {
        Ok(0) => PanelPhase::Empty,
        Ok(_) => PanelPhase::Active,
        Err(_) => PanelPhase::Error,
    }
}

#[derive(Clone, Copy)]
pub(crate) struct SessionContext(pub TocSession);

#[derive(Clone, Copy)]
pub(crate) struct TocSession {
    pub settings: RwSignal<TocSettings>,
    pub phase: RwSignal<PanelPhase>,
    pub forest: RwSignal<Vec<TocNode>>,

    /// The currently active heading's `index`, or none.
    pub current_highlight: RwSignal<Option<usize>>,

    /// Panel-wide collapse override; `None` means the per-level default
    /// derived from `expanded_levels`.
    pub collapse_override: RwSignal<Option<bool>>,

    /// Free-floating pixel coordinates once the user drags the panel.
    pub panel_left: RwSignal<Option<f64>>,
    pub panel_top: RwSignal<Option<f64>>,
    pub panel_width: RwSignal<f64>,
    pub panel_height: RwSignal<f64>,

    /// Transient status toast (persistence failures, copy confirmation).
    pub toast: RwSignal<Option<String>>,

    /// Outline text shown for manual copying when the clipboard fails.
    pub copy_fallback: RwSignal<Option<String>>,

    /// Side table of live heading elements, keyed by `HeadingRecord::index`.
    /// Cleared on teardown so no handle outlives the panel.
    elements: StoredValue<Vec<web_sys::HtmlElement>, LocalStorage>,

    tracker: StoredValue<Option<VisibilityTracker>, LocalStorage>,

    empty_dismiss_timer: StoredValue<Option<i32>>,
    preview_restore_timer: StoredValue<Option<i32>>,
    toast_timer: StoredValue<Option<i32>>,

    /// Scroll position to restore after a hover preview; survives chained
    /// previews so the user always returns to where they started.
    preview_origin: StoredValue<Option<f64>>,
}

impl TocSession {
    pub(crate) fn new() -> Self {
        Self::with_settings(storage::load_settings())
    }

    fn with_settings(settings: TocSettings) -> Self {
        // Restore persisted free-float coordinates for the floating mode.
        let (left, top) = if settings.panel_position == PanelPosition::Floating {
            (settings.panel_left, settings.panel_top)
        } else {
            (None, None)
        };
        let width = toc::clamp_panel_width(settings.panel_width);

        Self {
            settings: RwSignal::new(settings),
            phase: RwSignal::new(PanelPhase::Hidden),
            forest: RwSignal::new(Vec::new()),
            current_highlight: RwSignal::new(None),
            collapse_override: RwSignal::new(None),
            panel_left: RwSignal::new(left),
            panel_top: RwSignal::new(top),
            panel_width: RwSignal::new(width),
            panel_height: RwSignal::new(DEFAULT_PANEL_HEIGHT),
            toast: RwSignal::new(None),
            copy_fallback: RwSignal::new(None),
            elements: StoredValue::new_local(Vec::new()),
            tracker: StoredValue::new_local(None),
            empty_dismiss_timer: StoredValue::new(None),
            preview_restore_timer: StoredValue::new(None),
            toast_timer: StoredValue::new(None),
            preview_origin: StoredValue::new(None),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.phase.get_untracked() == PanelPhase::Active
    }

    pub(crate) fn toggle(&self) {
        if self.is_active() {
            self.hide();
        } else {
            self.generate();
        }
    }

    /// Generate a fresh forest and show the panel.
    ///
    /// A second generate while one is active first tears the old panel,
    /// observer and timers down completely; there is never an overlap.
    pub(crate) fn generate(&self) {
        self.teardown_artifacts();

        // Re-read settings so options changed since the last run apply.
        self.settings.set(storage::load_settings());
        self.phase.set(PanelPhase::Loading);

        let outcome = extract::generate_forest(&self.settings.get_untracked());
        let phase = phase_after_generate(&outcome.as_ref().map(|(f, _)| f.len()).map_err(Clone::clone));

        match outcome {
            Err(e) => {
                leptos::logging::error!("smart-toc: failed to generate TOC: {e}");
                self.forest.set(Vec::new());
            }
            Ok((forest, elements)) => {
                self.elements.set_value(elements);
                self.forest.set(forest);
                self.collapse_override.set(None);
            }
        }

        self.phase.set(phase);

        match phase {
            PanelPhase::Empty => self.schedule_empty_dismiss(),
            PanelPhase::Active => self.start_tracker(),
            _ => {}
        }
    }

    /// Tear everything down and hide the panel.
    pub(crate) fn hide(&self) {
        self.teardown_artifacts();
        self.forest.set(Vec::new());
        self.phase.set(PanelPhase::Hidden);
    }

    /// Detach the tracker, cancel pending timers and invalidate element
    /// handles. Leaves phase/forest alone so generate can reuse it.
    fn teardown_artifacts(&self) {
        let mut tracker = None;
        self.tracker.update_value(|t| tracker = t.take());
        drop(tracker); // disconnects the observer / removes the listener

        self.cancel_timer(&self.empty_dismiss_timer);
        self.cancel_timer(&self.preview_restore_timer);
        self.preview_origin.set_value(None);
        self.elements.update_value(|els| els.clear());
        self.current_highlight.set(None);
        self.copy_fallback.set(None);
    }

    fn start_tracker(&self) {
        if !self.settings.get_untracked().highlight_current {
            return;
        }
        let tracker = VisibilityTracker::start(*self);
        self.tracker.set_value(Some(tracker));
    }

    /// Idempotent highlight update: equal index means no UI change.
    pub(crate) fn set_active_heading(&self, index: Option<usize>) {
        if self.current_highlight.get_untracked() == index {
            return;
        }
        self.current_highlight.set(index);
    }

    pub(crate) fn with_elements<R>(&self, f: impl FnOnce(&[web_sys::HtmlElement]) -> R) -> R {
        self.elements.with_value(|els| f(els))
    }

    /// Smooth-scroll the document to a heading, with a 20px lead-in.
    pub(crate) fn scroll_to_heading(&self, index: usize) {
        let offset = self
            .forest
            .with_untracked(|f| toc::find_node(f, index).map(|n| n.record.vertical_offset));
        if let Some(offset) = offset {
            extract::scroll_to_offset(offset - toc::SCROLL_LEAD_IN_PX, true);
        }
    }

    /// Temporarily scroll to a heading; the prior position is restored
    /// after a fixed hold unless the preview is superseded.
    pub(crate) fn preview_heading(&self, index: usize) {
        let Some(window) = web_sys::window() else {
            return;
        };

        self.cancel_timer(&self.preview_restore_timer);

        // Chained previews keep the original pre-preview position.
        let mut origin = None;
        self.preview_origin.update_value(|o| origin = *o);
        let origin = origin.unwrap_or_else(|| window.scroll_y().unwrap_or(0.0));
        self.preview_origin.set_value(Some(origin));

        self.scroll_to_heading(index);

        let session = *self;
        let id = set_timeout(PREVIEW_RESTORE_MS, move || {
            session.preview_restore_timer.set_value(None);
            session.preview_origin.set_value(None);
            extract::scroll_to_offset(origin, false);
        });
        self.preview_restore_timer.set_value(id);
    }

    /// Copy the plain-text outline to the clipboard. On failure the user
    /// gets the text for manual copying; nothing is retried.
    pub(crate) fn copy_outline(&self) {
        let text = self.forest.with_untracked(|f| toc::plain_text_outline(f));
        if text.is_empty() {
            return;
        }

        let Some(window) = web_sys::window() else {
            return;
        };
        let promise = window.navigator().clipboard().write_text(&text);

        let session = *self;
        let on_ok = Closure::<dyn FnMut(wasm_bindgen::JsValue)>::new(move |_| {
            session.show_toast("Outline copied to clipboard");
        });
        let on_err = Closure::<dyn FnMut(wasm_bindgen::JsValue)>::new(move |_| {
            leptos::logging::warn!("smart-toc: clipboard write failed");
            session.copy_fallback.set(Some(text.clone()));
        });
        let _ = promise.then2(&on_ok, &on_err);

        // One-shot callbacks; the leak is bounded per user action.
        on_ok.forget();
        on_err.forget();
    }

    /// Persist the full panel geometry after a drag.
    pub(crate) fn persist_geometry(&self) {
        let mut settings = self.settings.get_untracked();
        settings.panel_position = PanelPosition::Floating;
        settings.panel_width = self.panel_width.get_untracked();
        settings.panel_left = self.panel_left.get_untracked();
        settings.panel_top = self.panel_top.get_untracked();
        self.update_settings(settings);
    }

    /// Persist the width after a resize.
    pub(crate) fn persist_width(&self) {
        let mut settings = self.settings.get_untracked();
        settings.panel_width = self.panel_width.get_untracked();
        self.update_settings(settings);
    }

    /// Apply and persist settings; a failed write is logged and surfaced
    /// while the in-memory values stay in effect.
    pub(crate) fn update_settings(&self, settings: TocSettings) {
        let settings = settings.sanitized();
        self.settings.set(settings.clone());
        if !storage::save_settings(&settings) {
            leptos::logging::warn!("smart-toc: failed to persist settings");
            self.show_toast("Could not save settings; keeping them for this page only");
        }
    }

    pub(crate) fn show_toast(&self, message: &str) {
        self.cancel_timer(&self.toast_timer);
        self.toast.set(Some(message.to_string()));

        let session = *self;
        let id = set_timeout(TOAST_MS, move || {
            session.toast_timer.set_value(None);
            session.toast.set(None);
        });
        self.toast_timer.set_value(id);
    }

    fn schedule_empty_dismiss(&self) {
        let session = *self;
        let id = set_timeout(EMPTY_DISMISS_MS, move || {
            session.empty_dismiss_timer.set_value(None);
            // The user may have regenerated or activated the panel since.
            if session.phase.get_untracked() == PanelPhase::Empty {
                session.phase.set(PanelPhase::Hidden);
            }
        });
        self.empty_dismiss_timer.set_value(id);
    }

    fn cancel_timer(&self, slot: &StoredValue<Option<i32>>) {
        let mut id = None;
        slot.update_value(|s| id = s.take());
        if let (Some(id), Some(window)) = (id, web_sys::window()) {
            window.clear_timeout_with_handle(id);
        }
    }
}

fn set_timeout(ms: i32, f: impl FnOnce() + 'static) -> Option<i32> {
    let window = web_sys::window()?;
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            Closure::once_into_js(f).as_ref().unchecked_ref(),
            ms,
        )
        .ok()
}
