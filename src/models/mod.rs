use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// One detected heading occurrence, in reading order.
///
/// The live DOM node is deliberately not stored here: the session keeps a
/// side table of elements keyed by `index`, so records stay serializable
/// and the handles can be invalidated on teardown.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct HeadingRecord {
    /// Source heading rank, 1..=6.
    pub level: u8,

    /// Trimmed visible text. Always at least 2 chars after filtering.
    pub text: String,

    /// Unique reading-order id, assigned 0..N-1 after the vertical sort.
    /// The sole cross-reference key between tree nodes, panel DOM and
    /// visibility state.
    pub index: usize,

    /// Absolute document-relative top at extraction time. Goes stale if
    /// the page reflows afterwards; regeneration is the fix.
    pub vertical_offset: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct TocNode {
    #[serde(flatten)]
    pub record: HeadingRecord,

    /// Insertion order = reading order. Every child's `level` is strictly
    /// greater than this node's.
    pub children: Vec<TocNode>,
}

impl TocNode {
    pub(crate) fn leaf(record: HeadingRecord) -> Self {
        Self {
            record,
            children: Vec::new(),
        }
    }
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub(crate) enum PanelPosition {
    #[default]
    Floating,
    Left,
    Right,
}

/// Persisted user settings.
///
/// Field names serialize in camelCase so exported files stay compatible
/// with the original extension's settings JSON.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct TocSettings {
    pub auto_detect: bool,
    pub highlight_current: bool,
    pub auto_dark_mode: bool,

    /// Extraction ceiling, 1..=6.
    pub max_heading_level: u8,

    /// Nodes deeper than this start visually collapsed.
    pub expanded_levels: u8,

    pub panel_position: PanelPosition,
    pub panel_width: f64,

    /// Free-floating pixel coordinates, set once the user drags the panel.
    pub panel_left: Option<f64>,
    pub panel_top: Option<f64>,
}

impl Default for TocSettings {
    fn default() -> Self {
        Self {
            auto_detect: true,
            highlight_current: true,
            auto_dark_mode: true,
            max_heading_level: 6,
            expanded_levels: 3,
            panel_position: PanelPosition::Floating,
            panel_width: 280.0,
            panel_left: None,
            panel_top: None,
        }
    }
}

impl TocSettings {
    /// Clamp out-of-range values coming from imported or hand-edited JSON.
    pub(crate) fn sanitized(mut self) -> Self {
        self.max_heading_level = self.max_heading_level.clamp(1, 6);
        self.expanded_levels = self.expanded_levels.clamp(1, 6);
        self.panel_width = crate::toc::clamp_panel_width(self.panel_width);
        self
    }
}
