//! Floating TOC panel: recursive forest rendering, highlight reflection,
//! the panel-wide collapse control, drag/resize, keyboard navigation,
//! copy and the settings drawer.

pub(crate) mod pointer;

use crate::models::{PanelPosition, TocNode, TocSettings};
use crate::session::{PanelPhase, SessionContext, TocSession};
use crate::storage;
use crate::toc;
use leptos::html;
use leptos::prelude::*;
use pointer::PointerMachine;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

#[component]
pub(crate) fn TocPanel() -> impl IntoView {
    let session = expect_context::<SessionContext>().0;

    // The shell remounts on every show, so refs and the pointer machine
    // start fresh each time.
    view! {
        <Show when=move || session.phase.get() != PanelPhase::Hidden fallback=|| ()>
            <PanelShell />
        </Show>
    }
}

#[component]
fn PanelShell() -> impl IntoView {
    let session = expect_context::<SessionContext>().0;
    let machine = PointerMachine::new();
    let settings_open = RwSignal::new(false);

    let panel_ref: NodeRef<html::Div> = NodeRef::new();
    let content_ref: NodeRef<html::Div> = NodeRef::new();

    // A drag in progress must not outlive the panel.
    on_cleanup(move || machine.abort());

    // Tracks settings so toggling dark mode rethemes the open panel.
    let panel_class = move || {
        tw_merge!(
            "smart-toc-panel",
            session.settings.with(|s| theme_class(s, prefers_dark()))
        )
    };

    let geometry_style = move || {
        let base = format!(
            "width:{}px;max-height:{}px;",
            session.panel_width.get(),
            session.panel_height.get()
        );
        match (session.panel_left.get(), session.panel_top.get()) {
            (Some(left), Some(top)) => {
                format!("{base}left:{left}px;top:{top}px;right:auto;transform:none;")
            }
            _ => match session.settings.get().panel_position {
                PanelPosition::Left => format!("{base}left:20px;top:100px;right:auto;"),
                PanelPosition::Right => format!("{base}right:20px;top:100px;left:auto;"),
                PanelPosition::Floating => {
                    format!("{base}left:50%;top:100px;right:auto;transform:translateX(-50%);")
                }
            },
        }
    };

    // Keep the highlighted link visible inside the panel's own viewport.
    Effect::new(move |_| {
        let Some(index) = session.current_highlight.get() else {
            return;
        };
        if let Some(content) = content_ref.get_untracked() {
            ensure_link_in_view(&content, index);
        }
    });

    let on_header_mousedown = move |ev: web_sys::MouseEvent| {
        // Control buttons are not drag handles.
        let on_button = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .is_some_and(|el| el.closest("button").ok().flatten().is_some());
        if on_button {
            return;
        }
        let Some(panel) = panel_ref.get_untracked() else {
            return;
        };
        let rect = panel.get_bounding_client_rect();
        let (initial_left, initial_top) = (rect.left(), rect.top());

        ev.prevent_default();
        machine.engage(
            &ev,
            move |dx, dy| {
                // Dragging switches to free-floating pixel coordinates.
                session.panel_left.set(Some(initial_left + dx));
                session.panel_top.set(Some(initial_top + dy));
            },
            move || session.persist_geometry(),
        );
    };

    let on_resize_mousedown = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        ev.prevent_default();
        let Some(panel) = panel_ref.get_untracked() else {
            return;
        };
        let rect = panel.get_bounding_client_rect();
        let (initial_w, initial_h) = (rect.width(), rect.height());

        machine.engage(
            &ev,
            move |dx, dy| {
                session
                    .panel_width
                    .set(toc::clamp_panel_width(initial_w + dx));
                session
                    .panel_height
                    .set(toc::clamp_panel_height(initial_h + dy));
            },
            move || session.persist_width(),
        );
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        handle_panel_keys(session, panel_ref, ev);
    };

    view! {
        <div
            id="smart-toc-panel"
            class=panel_class
            style=geometry_style
            tabindex="0"
            node_ref=panel_ref
            on:keydown=on_keydown
        >
            <div class="smart-toc-header" on:mousedown=on_header_mousedown>
                <h3>"Contents"</h3>
                <div class="smart-toc-controls">
                    <button
                        class="btn-collapse"
                        title="Collapse or expand all"
                        on:click=move |_| toggle_collapse(session)
                    >"▾"</button>
                    <button
                        class="btn-copy"
                        title="Copy outline"
                        on:click=move |_| session.copy_outline()
                    >"⧉"</button>
                    <button
                        class="btn-settings"
                        title="Settings"
                        on:click=move |_| settings_open.update(|open| *open = !*open)
                    >"⚙"</button>
                    <button
                        class="btn-close"
                        title="Close"
                        on:click=move |_| session.hide()
                    >"×"</button>
                </div>
            </div>

            <div class="smart-toc-content" node_ref=content_ref>
                {move || match session.phase.get() {
                    PanelPhase::Hidden => ().into_any(),
                    PanelPhase::Loading => view! {
                        <div class="loading-message">"Generating table of contents..."</div>
                    }
                    .into_any(),
                    PanelPhase::Empty => view! {
                        <div class="loading-message">"No headings found on this page"</div>
                    }
                    .into_any(),
                    PanelPhase::Error => view! {
                        <div class="error-message">
                            "Could not generate a table of contents."
                            <br />
                            "Refresh the page and try again."
                        </div>
                    }
                    .into_any(),
                    PanelPhase::Active => view! { <TocList /> }.into_any(),
                }}

                <Show when=move || session.copy_fallback.get().is_some() fallback=|| ()>
                    <div class="copy-fallback">
                        <div class="copy-fallback-hint">
                            "Clipboard unavailable. Copy the outline manually:"
                        </div>
                        <textarea
                            readonly=true
                            prop:value=move || session.copy_fallback.get().unwrap_or_default()
                        ></textarea>
                    </div>
                </Show>

                <Show when=move || settings_open.get() fallback=|| ()>
                    <SettingsDrawer />
                </Show>
            </div>

            <Show when=move || session.toast.get().is_some() fallback=|| ()>
                <div class="smart-toc-toast">
                    {move || session.toast.get().unwrap_or_default()}
                </div>
            </Show>

            <div class="smart-toc-resize-handle" on:mousedown=on_resize_mousedown></div>
        </div>
    }
}

#[component]
fn TocList() -> impl IntoView {
    let session = expect_context::<SessionContext>().0;
    move || session.forest.with(|forest| forest_view(session, forest))
}

fn forest_view(session: TocSession, nodes: &[TocNode]) -> AnyView {
    view! {
        <ul class="toc-list">
            {nodes
                .iter()
                .map(|node| node_view(session, node))
                .collect_view()}
        </ul>
    }
    .into_any()
}

fn node_view(session: TocSession, node: &TocNode) -> AnyView {
    let index = node.record.index;
    let level = node.record.level;
    let text = node.record.text.clone();

    let children = (!node.children.is_empty()).then(|| {
        let inner = forest_view(session, &node.children);
        let children_class = move || {
            let collapsed = session
                .collapse_override
                .get()
                .unwrap_or_else(|| level > session.settings.get().expanded_levels);
            if collapsed {
                "toc-children collapsed"
            } else {
                "toc-children"
            }
        };
        view! { <div class=children_class>{inner}</div> }
    });

    let item_class = move || {
        tw_merge!(
            "toc-item",
            format!("level-{level}"),
            if session.current_highlight.get() == Some(index) {
                "active"
            } else {
                ""
            }
        )
    };

    view! {
        <li class=item_class>
            <a
                href="#"
                class="toc-link"
                data-index=index.to_string()
                data-level=level.to_string()
                on:click=move |ev: web_sys::MouseEvent| {
                    ev.prevent_default();
                    session.scroll_to_heading(index);
                }
                on:mouseenter=move |ev: web_sys::MouseEvent| {
                    if ev.alt_key() {
                        session.preview_heading(index);
                    }
                }
            >
                {text}
            </a>
            {children}
        </li>
    }
    .into_any()
}

/// One panel-wide binary control: collapses or expands every sub-list at
/// once. The first press collapses if anything is currently expanded
/// under the per-level default.
fn toggle_collapse(session: TocSession) {
    let next = match session.collapse_override.get_untracked() {
        Some(collapsed) => !collapsed,
        None => {
            let expanded_levels = session.settings.get_untracked().expanded_levels;
            session
                .forest
                .with_untracked(|f| any_default_expanded(f, expanded_levels))
        }
    };
    session.collapse_override.set(Some(next));
}

/// Does any node render its children expanded under the per-level default?
fn any_default_expanded(nodes: &[TocNode], expanded_levels: u8) -> bool {
    nodes.iter().any(|node| {
        (!node.children.is_empty() && node.record.level <= expanded_levels)
            || any_default_expanded(&node.children, expanded_levels)
    })
}

fn prefers_dark() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media("(prefers-color-scheme: dark)").ok().flatten())
        .is_some_and(|mql| mql.matches())
}

fn theme_class(settings: &TocSettings, prefers_dark: bool) -> &'static str {
    if settings.auto_dark_mode && prefers_dark {
        "dark"
    } else {
        ""
    }
}

fn panel_links(panel: &web_sys::HtmlElement) -> Vec<web_sys::HtmlElement> {
    let mut out = Vec::new();
    if let Ok(nodes) = panel.query_selector_all(".toc-link") {
        for i in 0..nodes.length() {
            if let Some(el) = nodes
                .item(i)
                .and_then(|n| n.dyn_into::<web_sys::HtmlElement>().ok())
            {
                out.push(el);
            }
        }
    }
    out
}

fn focused_link_position(links: &[web_sys::HtmlElement]) -> Option<usize> {
    let active = web_sys::window()?.document()?.active_element()?;
    let active_node: &web_sys::Node = active.as_ref();
    links.iter().position(|el| el.is_same_node(Some(active_node)))
}

fn activate_link(session: TocSession, link: &web_sys::HtmlElement) {
    if let Some(index) = link
        .get_attribute("data-index")
        .and_then(|v| v.parse::<usize>().ok())
    {
        session.scroll_to_heading(index);
    }
}

fn handle_panel_keys(
    session: TocSession,
    panel_ref: NodeRef<html::Div>,
    ev: web_sys::KeyboardEvent,
) {
    let Some(panel) = panel_ref.get_untracked() else {
        return;
    };
    let links = panel_links(&panel);
    if links.is_empty() && ev.key() != "Escape" {
        return;
    }
    let focused = focused_link_position(&links);

    match ev.key().as_str() {
        "ArrowDown" => {
            ev.prevent_default();
            let next = focused.map_or(0, |i| (i + 1).min(links.len() - 1));
            if let Some(el) = links.get(next) {
                let _ = el.focus();
            }
        }
        "ArrowUp" => {
            ev.prevent_default();
            if let Some(i) = focused {
                if i > 0 {
                    if let Some(el) = links.get(i - 1) {
                        let _ = el.focus();
                    }
                }
            }
        }
        "Enter" | " " => {
            if let Some(i) = focused {
                ev.prevent_default();
                if let Some(el) = links.get(i) {
                    activate_link(session, el);
                }
            }
        }
        "Escape" => {
            ev.prevent_default();
            session.hide();
        }
        "Home" => {
            ev.prevent_default();
            if let Some(el) = links.first() {
                let _ = el.focus();
            }
        }
        "End" => {
            ev.prevent_default();
            if let Some(el) = links.last() {
                let _ = el.focus();
            }
        }
        key => {
            // Digit keys jump to the first visible link at that level.
            let Some(digit) = key
                .chars()
                .next()
                .filter(|_| key.len() == 1)
                .and_then(|c| c.to_digit(10))
            else {
                return;
            };
            if !(1..=9).contains(&digit) {
                return;
            }
            let target = links.iter().find(|el| {
                el.get_attribute("data-level") == Some(digit.to_string())
                    && el.closest(".collapsed").ok().flatten().is_none()
            });
            if let Some(el) = target {
                ev.prevent_default();
                let _ = el.focus();
            }
        }
    }
}

/// Scroll the panel's list so the highlighted link stays visible.
fn ensure_link_in_view(content: &web_sys::HtmlElement, index: usize) {
    let Ok(Some(link)) = content.query_selector(&format!("[data-index=\"{index}\"]")) else {
        return;
    };
    let content_rect = content.get_bounding_client_rect();
    let link_rect = link.get_bounding_client_rect();

    if link_rect.top() < content_rect.top() {
        let delta = (content_rect.top() - link_rect.top()) as i32 + 8;
        content.set_scroll_top(content.scroll_top() - delta);
    } else if link_rect.bottom() > content_rect.bottom() {
        let delta = (link_rect.bottom() - content_rect.bottom()) as i32 + 8;
        content.set_scroll_top(content.scroll_top() + delta);
    }
}

#[component]
fn SettingsDrawer() -> impl IntoView {
    let session = expect_context::<SessionContext>().0;

    let hostname = web_sys::window()
        .map(|w| w.location().hostname().unwrap_or_default())
        .unwrap_or_default();
    let host_disabled = RwSignal::new(storage::is_disabled_for_host(&hostname));
    let import_text = RwSignal::new(String::new());

    let export_text = move || storage::export_settings_json(&session.settings.get());

    let toggle_auto_detect = move |_| {
        let mut s = session.settings.get_untracked();
        s.auto_detect = !s.auto_detect;
        session.update_settings(s);
    };
    let toggle_highlight = move |_| {
        let mut s = session.settings.get_untracked();
        s.highlight_current = !s.highlight_current;
        session.update_settings(s);
    };
    let toggle_dark = move |_| {
        let mut s = session.settings.get_untracked();
        s.auto_dark_mode = !s.auto_dark_mode;
        session.update_settings(s);
    };

    let on_max_level = move |ev: web_sys::Event| {
        if let Ok(level) = event_target_value(&ev).parse::<u8>() {
            let mut s = session.settings.get_untracked();
            s.max_heading_level = level;
            session.update_settings(s);
        }
    };
    let on_expanded_levels = move |ev: web_sys::Event| {
        if let Ok(level) = event_target_value(&ev).parse::<u8>() {
            let mut s = session.settings.get_untracked();
            s.expanded_levels = level;
            session.update_settings(s);
            // Re-apply the per-level default on the rendered tree.
            session.collapse_override.set(None);
        }
    };
    let on_position = move |ev: web_sys::Event| {
        if let Ok(position) = event_target_value(&ev).parse::<PanelPosition>() {
            let mut s = session.settings.get_untracked();
            s.panel_position = position;
            // Presets override any free-float coordinates.
            if position != PanelPosition::Floating {
                s.panel_left = None;
                s.panel_top = None;
                session.panel_left.set(None);
                session.panel_top.set(None);
            }
            session.update_settings(s);
        }
    };
    let on_width = move |ev: web_sys::Event| {
        if let Ok(width) = event_target_value(&ev).parse::<f64>() {
            let width = toc::clamp_panel_width(width);
            let mut s = session.settings.get_untracked();
            s.panel_width = width;
            session.update_settings(s);
            session.panel_width.set(width);
        }
    };

    let host_label = hostname.clone();
    let host_for_toggle = hostname.clone();
    let on_toggle_host = move |_| match storage::toggle_disabled_for_host(&host_for_toggle) {
        Some(enabled) => {
            host_disabled.set(!enabled);
            session.show_toast(if enabled {
                "Enabled on this site; regenerate to apply"
            } else {
                "Disabled on this site"
            });
        }
        None => session.show_toast("Could not update the per-site setting"),
    };

    let on_import = move |_| {
        let current = session.settings.get_untracked();
        match storage::import_settings_json(&current, &import_text.get_untracked()) {
            Ok(imported) => {
                session.update_settings(imported);
                import_text.set(String::new());
                session.show_toast("Settings imported");
            }
            Err(message) => session.show_toast(&message),
        }
    };
    let on_reset = move |_| {
        session.update_settings(TocSettings::default());
        session.collapse_override.set(None);
        session.show_toast("Settings reset to defaults");
    };

    view! {
        <div class="smart-toc-settings">
            <label class="setting-row">
                <input
                    type="checkbox"
                    prop:checked=move || session.settings.get().auto_detect
                    on:change=toggle_auto_detect
                />
                "Auto-detect main content"
            </label>
            <label class="setting-row">
                <input
                    type="checkbox"
                    prop:checked=move || session.settings.get().highlight_current
                    on:change=toggle_highlight
                />
                "Highlight current heading"
            </label>
            <label class="setting-row">
                <input
                    type="checkbox"
                    prop:checked=move || session.settings.get().auto_dark_mode
                    on:change=toggle_dark
                />
                "Follow system dark mode"
            </label>

            <label class="setting-row">
                "Max heading level"
                <select on:change=on_max_level>
                    {(1u8..=6)
                        .map(|n| view! {
                            <option
                                value=n.to_string()
                                selected=move || session.settings.get().max_heading_level == n
                            >
                                {format!("H{n}")}
                            </option>
                        })
                        .collect_view()}
                </select>
            </label>
            <label class="setting-row">
                "Expanded levels"
                <select on:change=on_expanded_levels>
                    {(1u8..=6)
                        .map(|n| view! {
                            <option
                                value=n.to_string()
                                selected=move || session.settings.get().expanded_levels == n
                            >
                                {n.to_string()}
                            </option>
                        })
                        .collect_view()}
                </select>
            </label>
            <label class="setting-row">
                "Panel position"
                <select on:change=on_position>
                    {[
                        (PanelPosition::Floating, "Floating"),
                        (PanelPosition::Left, "Left"),
                        (PanelPosition::Right, "Right"),
                    ]
                        .into_iter()
                        .map(|(position, label)| view! {
                            <option
                                value=position.to_string()
                                selected=move || {
                                    session.settings.get().panel_position == position
                                }
                            >
                                {label}
                            </option>
                        })
                        .collect_view()}
                </select>
            </label>
            <label class="setting-row">
                "Panel width"
                <input
                    type="number"
                    min="200"
                    max="600"
                    prop:value=move || session.settings.get().panel_width.to_string()
                    on:change=on_width
                />
            </label>

            <div class="setting-row">
                <button on:click=on_toggle_host>
                    {move || {
                        if host_disabled.get() {
                            format!("Enable on {host_label}")
                        } else {
                            format!("Disable on {host_label}")
                        }
                    }}
                </button>
            </div>

            <div class="setting-row">
                "Export"
                <textarea readonly=true prop:value=export_text></textarea>
            </div>
            <div class="setting-row">
                "Import"
                <textarea
                    placeholder="Paste a settings JSON object"
                    prop:value=move || import_text.get()
                    on:input=move |ev| import_text.set(event_target_value(&ev))
                ></textarea>
                <button on:click=on_import>"Apply"</button>
            </div>
            <div class="setting-row">
                <button on:click=on_reset>"Reset to defaults"</button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HeadingRecord;
    use crate::toc::build_forest;

    fn heading(level: u8, index: usize) -> HeadingRecord {
        HeadingRecord {
            level,
            text: format!("h{level}-{index}"),
            index,
            vertical_offset: index as f64 * 100.0,
        }
    }

    #[test]
    fn default_expansion_depends_on_threshold() {
        // H1 > H2 > H3: with threshold 3 the H1 and H2 containers are
        // expanded; with threshold 0 everything starts collapsed.
        let forest = build_forest(vec![heading(1, 0), heading(2, 1), heading(3, 2)]);
        assert!(any_default_expanded(&forest, 3));
        assert!(!any_default_expanded(&forest, 0));
    }

    #[test]
    fn leaf_only_forest_has_nothing_to_expand() {
        let forest = build_forest(vec![heading(1, 0), heading(1, 1)]);
        assert!(!any_default_expanded(&forest, 6));
    }

    #[test]
    fn deep_parent_counts_when_threshold_reaches_it() {
        let forest = build_forest(vec![heading(4, 0), heading(5, 1)]);
        assert!(!any_default_expanded(&forest, 3));
        assert!(any_default_expanded(&forest, 4));
    }

    #[test]
    fn dark_theme_needs_both_setting_and_media() {
        let on = TocSettings::default();
        let off = TocSettings {
            auto_dark_mode: false,
            ..TocSettings::default()
        };

        assert_eq!(theme_class(&on, true), "dark");
        assert_eq!(theme_class(&on, false), "");
        assert_eq!(theme_class(&off, true), "");
        assert_eq!(theme_class(&off, false), "");
    }
}
