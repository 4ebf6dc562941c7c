//! Inbound command surface. The extension transport (popup, background
//! worker, keyboard shortcut) delivers `{action}` messages into the page;
//! each one gets an immediate acknowledgement posted back on the same
//! window.

use crate::session::TocSession;
use leptos::ev;
use leptos_dom::helpers::window_event_listener;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

/// Marker carried by our own acks so the listener can skip them.
const ACK_SOURCE: &str = "smart-toc";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr, EnumString)]
pub(crate) enum Command {
    #[strum(serialize = "toggleToc")]
    ToggleToc,
    #[strum(serialize = "getStatus")]
    GetStatus,
    #[strum(serialize = "generateToc")]
    GenerateToc,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum Ack {
    Success {
        success: bool,
    },
    Status {
        #[serde(rename = "isActive")]
        is_active: bool,
    },
}

/// Run a command against the session and produce its acknowledgement.
pub(crate) fn apply(command: Command, session: &TocSession) -> Ack {
    match command {
        Command::ToggleToc => {
            session.toggle();
            Ack::Success { success: true }
        }
        Command::GetStatus => Ack::Status {
            is_active: session.is_active(),
        },
        Command::GenerateToc => {
            session.generate();
            Ack::Success { success: true }
        }
    }
}

/// Attach the window `message` listener. Unknown actions and our own acks
/// are ignored. The listener lives for the page lifetime; the handle is
/// intentionally not retained.
pub(crate) fn register_command_listener(session: TocSession) {
    let _ = window_event_listener(ev::message, move |ev: web_sys::MessageEvent| {
        let data = ev.data();
        if !data.is_object() {
            return;
        }

        // Skip acks we posted ourselves.
        if js_sys::Reflect::get(&data, &"source".into())
            .ok()
            .and_then(|v| v.as_string())
            .as_deref()
            == Some(ACK_SOURCE)
        {
            return;
        }

        let Some(action) = js_sys::Reflect::get(&data, &"action".into())
            .ok()
            .and_then(|v| v.as_string())
        else {
            return;
        };
        let Ok(command) = action.parse::<Command>() else {
            return;
        };

        post_ack(&action, apply(command, &session));
    });
}

fn post_ack(action: &str, ack: Ack) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(mut value) = serde_json::to_value(ack) else {
        return;
    };
    if let Some(map) = value.as_object_mut() {
        map.insert("source".to_string(), ACK_SOURCE.into());
        map.insert("action".to_string(), action.into());
    }
    let Ok(json) = serde_json::to_string(&value) else {
        return;
    };
    let Ok(js) = js_sys::JSON::parse(&json) else {
        return;
    };
    let _ = window.post_message(&js, "*");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_to_commands() {
        assert_eq!("toggleToc".parse::<Command>(), Ok(Command::ToggleToc));
        assert_eq!("getStatus".parse::<Command>(), Ok(Command::GetStatus));
        assert_eq!("generateToc".parse::<Command>(), Ok(Command::GenerateToc));
        assert!("openOptionsPage".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn command_action_strings_roundtrip() {
        for command in [Command::ToggleToc, Command::GetStatus, Command::GenerateToc] {
            assert_eq!(command.as_ref().parse::<Command>(), Ok(command));
        }
    }

    #[test]
    fn ack_serializes_to_expected_shapes() {
        let success = serde_json::to_value(Ack::Success { success: true }).expect("serialize");
        assert_eq!(success, serde_json::json!({"success": true}));

        let status = serde_json::to_value(Ack::Status { is_active: false }).expect("serialize");
        assert_eq!(status, serde_json::json!({"isActive": false}));
    }
}
