//! Host-embedding command protocol
//!
//! A host page (or any client of the daemon) drives the viewer with named
//! commands of the form `{ "type": "ufcim.focusOnPin", "payload": { ... } }`.
//! Each command maps onto a direct-call method of the viewer API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid command message: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Command message has no type")]
    MissingType,
    #[error("Unknown command type: {0}")]
    UnknownType(String),
}

/// Options for focusing on a pin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusOptions {
    #[serde(default)]
    pub open_popup: bool,
}

/// A command sent by the embedding host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HostCommand {
    #[serde(rename = "ufcim.focusOnPin", rename_all = "camelCase")]
    FocusOnPin {
        pin_id: String,
        #[serde(default)]
        options: FocusOptions,
    },
    #[serde(rename = "ufcim.focusOnFloor", rename_all = "camelCase")]
    FocusOnFloor { building_id: String, floor_level: i32 },
    #[serde(rename = "ufcim.focusOnBuilding", rename_all = "camelCase")]
    FocusOnBuilding { building_id: String },
    #[serde(rename = "ufcim.setPinColor", rename_all = "camelCase")]
    SetPinColor { pin_id: String, color: String },
    #[serde(rename = "ufcim.setPinColorPreset", rename_all = "camelCase")]
    SetPinColorPreset { pin_id: String, preset_index: usize },
    #[serde(rename = "ufcim.resetCamera")]
    ResetCamera,
}

/// Every type tag the protocol accepts
pub const COMMAND_TYPES: [&str; 6] = [
    "ufcim.focusOnPin",
    "ufcim.focusOnFloor",
    "ufcim.focusOnBuilding",
    "ufcim.setPinColor",
    "ufcim.setPinColorPreset",
    "ufcim.resetCamera",
];

impl HostCommand {
    /// Parse a command message, distinguishing unknown types from bad payloads
    pub fn parse(text: &str) -> Result<Self, CommandError> {
        let value: Value = serde_json::from_str(text)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CommandError::MissingType)?;
        if !COMMAND_TYPES.contains(&kind) {
            return Err(CommandError::UnknownType(kind.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// The protocol type tag
    pub fn kind(&self) -> &'static str {
        match self {
            HostCommand::FocusOnPin { .. } => COMMAND_TYPES[0],
            HostCommand::FocusOnFloor { .. } => COMMAND_TYPES[1],
            HostCommand::FocusOnBuilding { .. } => COMMAND_TYPES[2],
            HostCommand::SetPinColor { .. } => COMMAND_TYPES[3],
            HostCommand::SetPinColorPreset { .. } => COMMAND_TYPES[4],
            HostCommand::ResetCamera => COMMAND_TYPES[5],
        }
    }
}

/// Outcome of a dispatched command, sent back to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub command: String,
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd = HostCommand::parse(
            r#"{"type": "ufcim.focusOnPin", "payload": {"pinId": "A101", "options": {"openPopup": true}}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            HostCommand::FocusOnPin {
                pin_id: "A101".to_string(),
                options: FocusOptions { open_popup: true },
            }
        );

        let cmd = HostCommand::parse(
            r#"{"type": "ufcim.focusOnFloor", "payload": {"buildingId": "BlocoA", "floorLevel": 1}}"#,
        )
        .unwrap();
        assert_eq!(cmd.kind(), "ufcim.focusOnFloor");

        let cmd = HostCommand::parse(r#"{"type": "ufcim.resetCamera"}"#).unwrap();
        assert_eq!(cmd, HostCommand::ResetCamera);

        let cmd = HostCommand::parse(
            r#"{"type": "ufcim.focusOnPin", "payload": {"pinId": "A101"}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            HostCommand::FocusOnPin {
                pin_id: "A101".to_string(),
                options: FocusOptions::default(),
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            HostCommand::parse(r#"{"type": "ufcim.explode"}"#),
            Err(CommandError::UnknownType(t)) if t == "ufcim.explode"
        ));
        assert!(matches!(
            HostCommand::parse(r#"{"payload": {}}"#),
            Err(CommandError::MissingType)
        ));
        assert!(matches!(
            HostCommand::parse(r#"{"type": "ufcim.setPinColor", "payload": {"pinId": "A"}}"#),
            Err(CommandError::Parse(_))
        ));
    }

    #[test]
    fn test_kind_roundtrip() {
        let cmd = HostCommand::SetPinColorPreset {
            pin_id: "A101".to_string(),
            preset_index: 2,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"presetIndex\":2"));
        assert_eq!(HostCommand::parse(&json).unwrap().kind(), cmd.kind());
    }
}
