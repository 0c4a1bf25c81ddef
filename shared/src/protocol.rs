//! Wire protocol: JSON text frames tagged with a `type` field.

use crate::math::Vector2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discrete movement intent. Only one axis is ever active; there is no
/// diagonal combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Stop,
}

impl Direction {
    pub const ALL: [Direction; 5] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Stop,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Direction::Up),
            "down" => Some(Direction::Down),
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "stop" => Some(Direction::Stop),
            _ => None,
        }
    }

    /// Lenient conversion from an untrusted JSON value.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(Self::parse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Stop => "stop",
        }
    }

    /// Axis-aligned velocity with magnitude `speed` (zero for `Stop`).
    /// Up is towards smaller y.
    pub fn velocity(self, speed: f32) -> Vector2 {
        match self {
            Direction::Up => Vector2::new(0.0, -speed),
            Direction::Down => Vector2::new(0.0, speed),
            Direction::Left => Vector2::new(-speed, 0.0),
            Direction::Right => Vector2::new(speed, 0.0),
            Direction::Stop => Vector2::ZERO,
        }
    }
}

/// Player state as seen by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub vx: f32,
    pub vy: f32,
}

/// Messages sent from client to server.
///
/// `join` and `input` carry raw JSON values so that wrongly typed fields
/// degrade to defaults instead of rejecting the whole frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<Value>,
        #[serde(default, rename = "clientId", skip_serializing_if = "Option::is_none")]
        client_id: Option<Value>,
    },
    Input {
        #[serde(default)]
        direction: Option<Value>,
    },
    Position {
        x: f32,
        y: f32,
    },
    Chat {
        message: String,
    },
}

impl ClientMessage {
    pub fn join(name: &str, client_id: Option<&str>) -> Self {
        ClientMessage::Join {
            name: Some(Value::from(name)),
            client_id: client_id.map(Value::from),
        }
    }

    pub fn input(direction: Direction) -> Self {
        ClientMessage::Input {
            direction: Some(Value::from(direction.as_str())),
        }
    }

    pub fn position(position: Vector2) -> Self {
        ClientMessage::Position {
            x: position.x,
            y: position.y,
        }
    }

    pub fn chat(message: &str) -> Self {
        ClientMessage::Chat {
            message: message.to_string(),
        }
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Sent once to the joining connection only.
    Welcome {
        #[serde(rename = "myId")]
        my_id: String,
        player: PlayerRecord,
    },
    /// Full snapshot of every live player.
    GameState { players: Vec<PlayerRecord> },
    Chat { from: String, message: String },
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Why the server closed a connection.
///
/// Clients use the distinction to decide whether to rejoin with their stored
/// identity token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Another connection joined with the same player id.
    Replaced,
    /// The player sent nothing for longer than the inactivity timeout.
    Inactive,
}

impl CloseReason {
    pub const REPLACED_CODE: u16 = 4000;
    pub const INACTIVE_CODE: u16 = 4001;

    pub fn code(self) -> u16 {
        match self {
            CloseReason::Replaced => Self::REPLACED_CODE,
            CloseReason::Inactive => Self::INACTIVE_CODE,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            CloseReason::Replaced => "Replaced by new connection",
            CloseReason::Inactive => "Inactive",
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            Self::REPLACED_CODE => Some(CloseReason::Replaced),
            Self::INACTIVE_CODE => Some(CloseReason::Inactive),
            _ => None,
        }
    }
}
