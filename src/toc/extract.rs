//! DOM side of TOC generation: content-region detection, heading
//! extraction and scrolling. Runs synchronously within one event turn.

use crate::models::{HeadingRecord, TocNode, TocSettings};
use crate::toc;
use wasm_bindgen::JsCast;

/// Content-region candidates, most semantic first. The first one whose
/// visible text passes the substantiality test wins.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#content",
    ".content",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".post-body",
    ".article-body",
];

/// Headings inside any of these ancestors are page chrome, not content.
const IGNORED_ANCESTOR_SELECTORS: &[&str] = &[
    "nav",
    "header",
    "footer",
    "aside",
    ".sidebar",
    ".navigation",
    ".nav-menu",
    ".breadcrumb",
    "nav[role=\"navigation\"]",
];

/// Extract headings from the live document and build the forest.
///
/// Returns the forest plus the element side table, parallel to the
/// records' `index` fields.
pub(crate) fn generate_forest(
    settings: &TocSettings,
) -> Result<(Vec<TocNode>, Vec<web_sys::HtmlElement>), String> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let region = if settings.auto_detect {
        detect_main_region(&document)
    } else {
        document.body().map(web_sys::Element::from)
    }
    .ok_or("document has no body")?;

    let scroll_y = window.scroll_y().unwrap_or(0.0);
    let (records, elements) = extract_headings(&region, settings.max_heading_level, scroll_y);
    Ok((toc::build_forest(records), elements))
}

/// Locate the densest block of primary content, falling back to the whole
/// body. Never errors; `None` only when the document has no body at all.
pub(crate) fn detect_main_region(document: &web_sys::Document) -> Option<web_sys::Element> {
    for selector in CONTENT_SELECTORS {
        if let Ok(Some(el)) = document.query_selector(selector) {
            let text = el.text_content().unwrap_or_default();
            if toc::is_substantial_text(&text) {
                return Some(el);
            }
        }
    }
    document.body().map(web_sys::Element::from)
}

/// Scan the region rank by rank, filter out chrome/short/hidden headings,
/// then re-sort by vertical offset to restore true reading order before
/// assigning indices.
pub(crate) fn extract_headings(
    region: &web_sys::Element,
    max_level: u8,
    scroll_y: f64,
) -> (Vec<HeadingRecord>, Vec<web_sys::HtmlElement>) {
    struct Candidate {
        level: u8,
        text: String,
        top: f64,
        element: web_sys::HtmlElement,
    }

    let mut found: Vec<Candidate> = Vec::new();

    for level in 1..=max_level.clamp(1, 6) {
        let Ok(nodes) = region.query_selector_all(&format!("h{level}")) else {
            continue;
        };

        for i in 0..nodes.length() {
            let Some(node) = nodes.item(i) else { continue };
            let Ok(el) = node.dyn_into::<web_sys::HtmlElement>() else {
                continue;
            };

            if has_ignored_ancestor(&el) {
                continue;
            }

            // Catches icon-only and empty headings.
            let text = el.text_content().unwrap_or_default().trim().to_string();
            if text.chars().count() < 2 {
                continue;
            }

            // Zero rendered size means the element is hidden.
            let rect = el.get_bounding_client_rect();
            if rect.width() == 0.0 || rect.height() == 0.0 {
                continue;
            }

            found.push(Candidate {
                level,
                text,
                top: rect.top() + scroll_y,
                element: el,
            });
        }
    }

    // Levels were scanned outer-loop by rank; the vertical sort makes
    // `index` consistent with on-page order regardless of rank.
    found.sort_by(|a, b| a.top.partial_cmp(&b.top).unwrap_or(std::cmp::Ordering::Equal));

    let mut records = Vec::with_capacity(found.len());
    let mut elements = Vec::with_capacity(found.len());
    for (index, candidate) in found.into_iter().enumerate() {
        records.push(HeadingRecord {
            level: candidate.level,
            text: candidate.text,
            index,
            vertical_offset: candidate.top,
        });
        elements.push(candidate.element);
    }

    (records, elements)
}

fn has_ignored_ancestor(el: &web_sys::HtmlElement) -> bool {
    let mut parent = el.parent_element();
    while let Some(p) = parent {
        for selector in IGNORED_ANCESTOR_SELECTORS {
            if p.matches(selector).unwrap_or(false) {
                return true;
            }
        }
        parent = p.parent_element();
    }
    false
}

/// Scroll the document to an absolute offset.
pub(crate) fn scroll_to_offset(top: f64, smooth: bool) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let opts = web_sys::ScrollToOptions::new();
    opts.set_top(top);
    opts.set_behavior(if smooth {
        web_sys::ScrollBehavior::Smooth
    } else {
        web_sys::ScrollBehavior::Auto
    });
    window.scroll_to_with_scroll_to_options(&opts);
}
