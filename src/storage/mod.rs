//! Settings collaborator: localStorage-backed persistence with in-memory
//! defaults, the per-host disabled set, and the export/import file format.
//!
//! Read/write failures are never fatal; callers surface them as a toast
//! and keep going with whatever is in memory.

use crate::models::TocSettings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub(crate) const SETTINGS_KEY: &str = "smart_toc_settings";
pub(crate) const DISABLED_HOSTS_KEY: &str = "smart_toc_disabled_hosts";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

pub(crate) fn load_json_from_storage<T: for<'de> Deserialize<'de>>(key: &str) -> Option<T> {
    let storage = local_storage()?;
    let json = storage.get_item(key).ok().flatten()?;
    serde_json::from_str(&json).ok()
}

/// Returns false when serialization or the storage write fails.
pub(crate) fn save_json_to_storage<T: Serialize>(key: &str, value: &T) -> bool {
    let Ok(json) = serde_json::to_string(value) else {
        return false;
    };
    let Some(storage) = local_storage() else {
        return false;
    };
    storage.set_item(key, &json).is_ok()
}

pub(crate) fn load_settings() -> TocSettings {
    load_json_from_storage::<TocSettings>(SETTINGS_KEY)
        .map(TocSettings::sanitized)
        .unwrap_or_default()
}

pub(crate) fn save_settings(settings: &TocSettings) -> bool {
    save_json_to_storage(SETTINGS_KEY, settings)
}

pub(crate) fn load_disabled_hosts() -> BTreeMap<String, bool> {
    load_json_from_storage::<BTreeMap<String, bool>>(DISABLED_HOSTS_KEY).unwrap_or_default()
}

pub(crate) fn is_disabled_for_host(hostname: &str) -> bool {
    load_disabled_hosts().get(hostname).copied().unwrap_or(false)
}

/// Flip the flag for a host; returns the new "enabled" state, or `None`
/// when the write fails.
pub(crate) fn toggle_disabled_for_host(hostname: &str) -> Option<bool> {
    if hostname.trim().is_empty() {
        return None;
    }
    let mut hosts = load_disabled_hosts();
    let disabled = !hosts.get(hostname).copied().unwrap_or(false);
    hosts.insert(hostname.to_string(), disabled);
    save_json_to_storage(DISABLED_HOSTS_KEY, &hosts).then_some(!disabled)
}

/// Full settings mapping as a pretty-printed UTF-8 JSON object.
pub(crate) fn export_settings_json(settings: &TocSettings) -> String {
    serde_json::to_string_pretty(settings).unwrap_or_else(|_| "{}".to_string())
}

/// Apply an imported settings file over the current values.
///
/// The file must parse as a JSON object; otherwise it is rejected and the
/// current settings are left untouched. Unknown keys are ignored, known
/// keys must typecheck, and out-of-range values are clamped.
pub(crate) fn import_settings_json(
    current: &TocSettings,
    text: &str,
) -> Result<TocSettings, String> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|_| "settings file is not valid JSON".to_string())?;
    let Some(imported) = value.as_object() else {
        return Err("settings file must be a JSON object".to_string());
    };

    let mut merged = serde_json::to_value(current).map_err(|e| e.to_string())?;
    if let Some(map) = merged.as_object_mut() {
        for (key, val) in imported {
            map.insert(key.clone(), val.clone());
        }
    }

    let parsed: TocSettings = serde_json::from_value(merged)
        .map_err(|_| "settings file has invalid values".to_string())?;
    Ok(parsed.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PanelPosition;

    #[test]
    fn import_rejects_non_object_json() {
        let current = TocSettings::default();
        assert!(import_settings_json(&current, "not json at all").is_err());
        assert!(import_settings_json(&current, "[1, 2, 3]").is_err());
        assert!(import_settings_json(&current, "\"string\"").is_err());
        assert!(import_settings_json(&current, "42").is_err());
    }

    #[test]
    fn import_overlays_known_keys_over_current() {
        let current = TocSettings {
            expanded_levels: 2,
            ..TocSettings::default()
        };
        let imported = import_settings_json(
            &current,
            r#"{"maxHeadingLevel": 3, "panelPosition": "left"}"#,
        )
        .expect("object import should apply");

        assert_eq!(imported.max_heading_level, 3);
        assert_eq!(imported.panel_position, PanelPosition::Left);
        // Keys absent from the file keep their current values.
        assert_eq!(imported.expanded_levels, 2);
    }

    #[test]
    fn import_ignores_unknown_keys() {
        let imported = import_settings_json(
            &TocSettings::default(),
            r#"{"someFutureKey": {"nested": true}, "panelWidth": 320}"#,
        )
        .expect("unknown keys should be ignored");
        assert_eq!(imported.panel_width, 320.0);
    }

    #[test]
    fn import_rejects_mistyped_known_keys() {
        assert!(
            import_settings_json(&TocSettings::default(), r#"{"maxHeadingLevel": "six"}"#)
                .is_err()
        );
    }

    #[test]
    fn import_clamps_out_of_range_values() {
        let imported = import_settings_json(
            &TocSettings::default(),
            r#"{"panelWidth": 1200, "maxHeadingLevel": 0}"#,
        )
        .expect("should import");
        assert_eq!(imported.panel_width, 600.0);
        assert_eq!(imported.max_heading_level, 1);
    }

    #[test]
    fn export_import_roundtrip() {
        let settings = TocSettings {
            panel_width: 340.0,
            panel_position: PanelPosition::Right,
            expanded_levels: 4,
            ..TocSettings::default()
        };
        let text = export_settings_json(&settings);
        let back = import_settings_json(&TocSettings::default(), &text)
            .expect("exported settings should import");
        assert_eq!(back, settings);
    }
}
