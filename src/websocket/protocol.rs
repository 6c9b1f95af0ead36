//! Canvas WebSocket protocol
//!
//! Clients send [`ClientAction`]s; the server answers each action with an
//! [`ServerMessage::Ack`] or [`ServerMessage::Error`] and pushes a fresh
//! snapshot after every canvas event.

use easel_canvas::{CanvasEvent, CanvasSnapshot, EntityId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action requested by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    Mount,
    Prompt {
        prompt: String,
    },
    Select {
        id: EntityId,
    },
    Deselect,
    Duplicate {
        id: EntityId,
    },
    Variations {
        id: EntityId,
        #[serde(default)]
        prompt: Option<String>,
    },
    Move {
        id: EntityId,
        x: f64,
        y: f64,
    },
    Delete {
        id: EntityId,
    },
    /// Persist the entity's current image
    Save {
        id: EntityId,
    },
    Arrange,
    Resize {
        width: f64,
        height: f64,
    },
    PlaceSaved {
        id: EntityId,
    },
    RefreshSaved,
    Ping,
}

impl ClientAction {
    /// Action name echoed back in acknowledgements
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Prompt { .. } => "prompt",
            Self::Select { .. } => "select",
            Self::Deselect => "deselect",
            Self::Duplicate { .. } => "duplicate",
            Self::Variations { .. } => "variations",
            Self::Move { .. } => "move",
            Self::Delete { .. } => "delete",
            Self::Save { .. } => "save",
            Self::Arrange => "arrange",
            Self::Resize { .. } => "resize",
            Self::PlaceSaved { .. } => "place_saved",
            Self::RefreshSaved => "refresh_saved",
            Self::Ping => "ping",
        }
    }
}

/// Message pushed to a client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once right after the upgrade
    Welcome {
        session_id: Uuid,
        snapshot: CanvasSnapshot,
    },
    /// Canvas state after `event` was applied
    Snapshot {
        event: CanvasEvent,
        snapshot: CanvasSnapshot,
    },
    /// A client action finished
    Ack {
        action: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
    },
    /// A client action failed or could not be parsed
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<&'static str>,
        message: String,
        code: String,
    },
    Pong,
}

impl ServerMessage {
    pub fn ack(action: &'static str, result: impl Serialize) -> Self {
        Self::Ack {
            action,
            result: serde_json::to_value(result).ok().filter(|v| !v.is_null()),
        }
    }

    pub fn failed(action: &'static str, err: &easel_canvas::Error) -> Self {
        Self::Error {
            action: Some(action),
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_action_deserialization() {
        let action: ClientAction =
            serde_json::from_str(r#"{"type":"move","id":"a","x":10.0,"y":20.5}"#).unwrap();
        assert_eq!(
            action,
            ClientAction::Move {
                id: EntityId::from("a"),
                x: 10.0,
                y: 20.5
            }
        );

        let action: ClientAction = serde_json::from_str(r#"{"type":"variations","id":"p"}"#).unwrap();
        assert!(matches!(action, ClientAction::Variations { prompt: None, .. }));
        assert_eq!(action.name(), "variations");
    }

    #[test]
    fn test_unknown_action_rejected() {
        assert!(serde_json::from_str::<ClientAction>(r#"{"type":"undo"}"#).is_err());
    }

    #[test]
    fn test_ack_drops_unit_result() {
        let json = serde_json::to_value(ServerMessage::ack("deselect", ())).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["action"], "deselect");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_error_message_carries_code() {
        let err = easel_canvas::Error::EntityNotFound(EntityId::from("gone"));
        let json = serde_json::to_value(ServerMessage::failed("delete", &err)).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "entity_not_found");
        assert_eq!(json["action"], "delete");
    }
}
