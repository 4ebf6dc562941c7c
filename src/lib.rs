//! Smart TOC: an in-page table-of-contents overlay.
//!
//! Scans the document for its main content region, extracts the headings
//! into a level-nested forest and renders a floating, draggable panel
//! that tracks the reader's position. Driven by `{action}` messages
//! posted on the window (toggle, status, regenerate).

pub mod app;
pub(crate) mod commands;
pub mod models;
pub(crate) mod panel;
pub(crate) mod session;
pub(crate) mod storage;
pub mod toc;
pub(crate) mod tracker;

pub use app::App;

use wasm_bindgen::prelude::wasm_bindgen;

#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::models::TocSettings;
    use crate::session::TocSession;
    use crate::storage;
    use crate::toc::extract;
    use leptos::prelude::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn document() -> web_sys::Document {
        web_sys::window().unwrap().document().unwrap()
    }

    #[wasm_bindgen_test]
    fn settings_survive_a_storage_roundtrip() {
        let mut settings = TocSettings::default();
        settings.max_heading_level = 4;
        settings.panel_width = 333.0;
        assert!(storage::save_settings(&settings));

        let loaded = storage::load_settings();
        assert_eq!(loaded.max_heading_level, 4);
        assert_eq!(loaded.panel_width, 333.0);
    }

    #[wasm_bindgen_test]
    fn per_host_disable_roundtrips() {
        let host = "example.test";
        assert!(!storage::is_disabled_for_host(host));

        assert_eq!(storage::toggle_disabled_for_host(host), Some(false));
        assert!(storage::is_disabled_for_host(host));

        assert_eq!(storage::toggle_disabled_for_host(host), Some(true));
        assert!(!storage::is_disabled_for_host(host));
    }

    #[wasm_bindgen_test]
    fn extraction_skips_chrome_and_short_headings() {
        let doc = document();
        let container = doc.create_element("div").unwrap();
        container.set_inner_html(
            "<h1>Introduction</h1>\
             <nav><h2>Site navigation</h2></nav>\
             <h2>Background</h2>\
             <h2>X</h2>",
        );
        doc.body().unwrap().append_child(&container).unwrap();

        let (records, elements) = extract::extract_headings(&container, 6, 0.0);

        container.remove();

        // The nav heading and the one-character heading are dropped.
        assert_eq!(records.len(), 2);
        assert_eq!(elements.len(), 2);
        assert_eq!(records[0].text, "Introduction");
        assert_eq!(records[0].level, 1);
        assert_eq!(records[1].text, "Background");
        assert_eq!(records[1].level, 2);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].index, 1);
    }

    #[wasm_bindgen_test]
    fn second_generate_rebuilds_from_scratch() {
        let doc = document();
        let container = doc.create_element("div").unwrap();
        container.set_inner_html("<h1>First title</h1><h2>First section</h2>");
        doc.body().unwrap().append_child(&container).unwrap();

        let session = TocSession::new();
        session.generate();
        assert!(session.is_active());
        assert_eq!(session.with_elements(|els| els.len()), 2);

        // Regenerating against changed content replaces everything.
        container.set_inner_html("<h1>Second title</h1>");
        session.generate();
        assert!(session.is_active());
        assert_eq!(session.with_elements(|els| els.len()), 1);
        assert_eq!(
            session.forest.with_untracked(|f| f[0].record.text.clone()),
            "Second title"
        );

        session.hide();
        assert!(!session.is_active());
        assert_eq!(session.with_elements(|els| els.len()), 0);
        assert!(session.forest.with_untracked(|f| f.is_empty()));

        container.remove();
    }

    #[wasm_bindgen_test]
    fn region_detection_prefers_substantial_main() {
        let doc = document();
        let main = doc.create_element("main").unwrap();
        let words = vec!["word"; 250].join(" ");
        main.set_inner_html(&format!("<p>{words}</p>"));
        doc.body().unwrap().append_child(&main).unwrap();

        let region = extract::detect_main_region(&doc).unwrap();
        let picked_main = region.tag_name().eq_ignore_ascii_case("main");

        main.remove();
        assert!(picked_main);
    }

    #[wasm_bindgen_test]
    fn thin_main_falls_back_to_body() {
        let doc = document();
        let main = doc.create_element("main").unwrap();
        main.set_inner_html("<p>just a few words</p>");
        doc.body().unwrap().append_child(&main).unwrap();

        let region = extract::detect_main_region(&doc).unwrap();
        let picked_body = region.tag_name().eq_ignore_ascii_case("body");

        main.remove();
        assert!(picked_body);
    }
}
