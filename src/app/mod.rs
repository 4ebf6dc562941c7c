//! Root component: session/context wiring, the inbound command listener
//! and the per-host kill switch.

use crate::commands;
use crate::panel::TocPanel;
use crate::session::{SessionContext, TocSession};
use crate::storage;
use leptos::ev;
use leptos::prelude::*;
use leptos_dom::helpers::window_event_listener;

#[component]
pub fn App() -> impl IntoView {
    let hostname = web_sys::window()
        .map(|w| w.location().hostname().unwrap_or_default())
        .unwrap_or_default();
    let disabled = storage::is_disabled_for_host(&hostname);

    let session = TocSession::new();
    provide_context(SessionContext(session));

    if disabled {
        leptos::logging::log!("smart-toc: disabled on {hostname}");
    } else {
        commands::register_command_listener(session);
        // Drop observers and timers before the page is torn down.
        let _ = window_event_listener(ev::pagehide, move |_| session.hide());
    }

    view! {
        <Show when=move || !disabled fallback=|| ()>
            <TocPanel />
        </Show>
    }
}
