//! Types and rules shared by the server and the client: game constants, the
//! wire protocol, the static map, circle-vs-polygon collision and the
//! movement rules both sides simulate with.

pub mod collision;
pub mod map;
pub mod math;
pub mod movement;
pub mod protocol;

pub use collision::{
    check_circle_movement_collision, circle_polygon_collision, first_contact, point_in_polygon,
    resolve_circle_polygon_collision, ObstacleResolver, SinglePassResolver,
};
pub use map::{default_obstacles, RenderStyle, StaticObject};
pub use math::Vector2;
pub use movement::{MovementRules, PlatformerBody, PlatformerInput};
pub use protocol::{ClientMessage, CloseReason, Direction, PlayerRecord, ServerMessage};

pub const WORLD_WIDTH: f32 = 1600.0;
pub const WORLD_HEIGHT: f32 = 900.0;
pub const TICK_RATE: u32 = 20;
/// World units per second.
pub const PLAYER_SPEED: f32 = 280.0;
pub const PLAYER_RADIUS: f32 = 16.0;
pub const INACTIVITY_TIMEOUT_SECS: u64 = 60;

pub const PLAYER_ID_PREFIX: &str = "player-";
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";
pub const MAX_NAME_LEN: usize = 24;
pub const MAX_CHAT_LEN: usize = 200;

/// How often a client in the continuous-position model reports its position.
pub const POSITION_SEND_INTERVAL_MS: u64 = 50;
