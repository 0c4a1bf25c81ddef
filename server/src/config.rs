//! Startup configuration. The core treats every value here as a constant for
//! the lifetime of the process.

use clap::ValueEnum;
use shared::{
    default_obstacles, MovementRules, StaticObject, INACTIVITY_TIMEOUT_SECS, PLAYER_RADIUS,
    PLAYER_SPEED, TICK_RATE, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::time::Duration;
use thiserror::Error;

/// Which client message drives player movement.
///
/// The models are alternate configurations; a server never mixes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MovementModel {
    /// `input` directions set a velocity that the tick integrates.
    #[default]
    Velocity,
    /// `position` reports are clamped, collision-resolved and written
    /// directly. Weaker server authority than `Velocity`.
    Position,
    /// Like `Position`, for clients simulating gravity and jumps. Players
    /// spawn at a fixed point on the world floor.
    Platformer,
}

impl MovementModel {
    /// True if clients report positions instead of directions.
    pub fn reports_positions(self) -> bool {
        matches!(self, MovementModel::Position | MovementModel::Platformer)
    }
}

/// When the tick pushes a snapshot to joined clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BroadcastPolicy {
    #[default]
    Always,
    /// Only after a tick in which a player moved or was evicted, or after
    /// the roster changed since the last broadcast (a player created or
    /// removed, or a position report accepted).
    OnChange,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick rate must be at least 1 Hz")]
    ZeroTickRate,
    #[error("world bounds must be positive and finite, got {width}x{height}")]
    InvalidWorldBounds { width: f32, height: f32 },
    #[error("player speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f32),
    #[error("player radius must be finite and positive, got {0}")]
    InvalidRadius(f32),
    #[error("inactivity timeout must be non-zero")]
    ZeroInactivityTimeout,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub tick_rate: u32,
    pub world_width: f32,
    pub world_height: f32,
    /// World units per second.
    pub player_speed: f32,
    pub player_radius: f32,
    pub inactivity_timeout: Duration,
    pub movement_model: MovementModel,
    pub broadcast_policy: BroadcastPolicy,
    pub obstacles: Vec<StaticObject>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            tick_rate: TICK_RATE,
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            player_speed: PLAYER_SPEED,
            player_radius: PLAYER_RADIUS,
            inactivity_timeout: Duration::from_secs(INACTIVITY_TIMEOUT_SECS),
            movement_model: MovementModel::default(),
            broadcast_policy: BroadcastPolicy::default(),
            obstacles: default_obstacles(),
        }
    }
}

impl ServerConfig {
    /// Fixed simulation step. Falls back to one second for a zero tick rate,
    /// which `validate` rejects anyway.
    pub fn tick_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.tick_rate.max(1)))
    }

    pub fn movement_rules(&self) -> MovementRules {
        MovementRules {
            world_width: self.world_width,
            world_height: self.world_height,
            player_speed: self.player_speed,
            player_radius: self.player_radius,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }

        let valid_bound = |v: f32| v.is_finite() && v > 0.0;
        if !valid_bound(self.world_width) || !valid_bound(self.world_height) {
            return Err(ConfigError::InvalidWorldBounds {
                width: self.world_width,
                height: self.world_height,
            });
        }

        if !self.player_speed.is_finite() || self.player_speed < 0.0 {
            return Err(ConfigError::InvalidSpeed(self.player_speed));
        }

        if !valid_bound(self.player_radius) {
            return Err(ConfigError::InvalidRadius(self.player_radius));
        }

        if self.inactivity_timeout.is_zero() {
            return Err(ConfigError::ZeroInactivityTimeout);
        }

        Ok(())
    }
}
