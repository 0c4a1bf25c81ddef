//! Movement rules shared by the server tick and the client's local
//! simulation, so both sides integrate, clamp and resolve the same way.
//!
//! Two flavours live here:
//! - top-down stepping, where a velocity is integrated and the circle is
//!   kept out of obstacles
//! - [`PlatformerBody`], a gravity and jump controller for clients running
//!   the platformer variant of the position model

use crate::collision::{
    circle_polygon_collision, first_contact, point_in_polygon, resolve_circle_polygon_collision,
    segment_intersects_polygon, ObstacleResolver,
};
use crate::map::StaticObject;
use crate::math::Vector2;
use crate::protocol::Direction;
use crate::{PLAYER_RADIUS, PLAYER_SPEED, WORLD_HEIGHT, WORLD_WIDTH};

/// Downward acceleration, world units per second squared.
pub const GRAVITY: f32 = 2000.0;
pub const MAX_FALL_SPEED: f32 = 1400.0;
/// Upward speed at take-off.
pub const JUMP_INITIAL_SPEED: f32 = 700.0;
/// Extra upward acceleration while the jump is held.
pub const JUMP_HOLD_ACCEL: f32 = 1200.0;
pub const JUMP_MAX_HOLD_SECS: f32 = 0.18;
/// A jump is still allowed this long after walking off a ledge.
pub const COYOTE_TIME_SECS: f32 = 0.12;
/// A jump pressed this long before landing fires on landing.
pub const JUMP_BUFFER_SECS: f32 = 0.12;
/// How far below the circle a surface still counts as ground.
pub const GROUND_REACH: f32 = 6.0;
/// Platformer players spawn standing on the world floor at this x.
pub const PLATFORM_SPAWN_X: f32 = 80.0;

const SURFACE_EPSILON: f32 = 1e-3;

/// World bounds and player dimensions that movement depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRules {
    pub world_width: f32,
    pub world_height: f32,
    /// World units per second.
    pub player_speed: f32,
    pub player_radius: f32,
}

impl Default for MovementRules {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            player_speed: PLAYER_SPEED,
            player_radius: PLAYER_RADIUS,
        }
    }
}

impl MovementRules {
    pub fn clamp(&self, position: Vector2) -> Vector2 {
        position.clamp_to_bounds(self.world_width, self.world_height)
    }

    /// Clamps to the world, resolves obstacle overlap, and clamps again so the
    /// bounds invariant holds even when a push points outside the world.
    pub fn constrain(
        &self,
        position: Vector2,
        obstacles: &[StaticObject],
        resolver: &dyn ObstacleResolver,
    ) -> Vector2 {
        let clamped = self.clamp(position);
        if obstacles.is_empty() {
            return clamped;
        }
        self.clamp(resolver.resolve(clamped, self.player_radius, obstacles))
    }

    /// One top-down step: integrate `velocity` over `dt`, clamp, cut the move
    /// at the first obstacle it runs into, then resolve and clamp again.
    pub fn step(
        &self,
        from: Vector2,
        velocity: Vector2,
        dt: f32,
        obstacles: &[StaticObject],
        resolver: &dyn ObstacleResolver,
    ) -> Vector2 {
        let mut to = self.clamp(from + velocity * dt);
        if to != from {
            if let Some(contact) = first_contact(from, to, self.player_radius, obstacles) {
                to = contact;
            }
        }
        self.constrain(to, obstacles, resolver)
    }

    /// Where a platformer player appears: on the floor near the left edge.
    pub fn platform_spawn(&self) -> Vector2 {
        self.clamp_inset(Vector2::new(PLATFORM_SPAWN_X, self.world_height))
    }

    /// Keeps the whole circle inside the world, not just its center.
    fn clamp_inset(&self, position: Vector2) -> Vector2 {
        let r = self.player_radius;
        Vector2::new(
            position.x.max(r).min(self.world_width - r),
            position.y.max(r).min(self.world_height - r),
        )
    }

    fn has_ground_support(&self, position: Vector2, obstacles: &[StaticObject]) -> bool {
        let r = self.player_radius;
        let reach_bottom = position.y + r + GROUND_REACH;
        let feet = [-0.8 * r, -0.4 * r, 0.0, 0.4 * r, 0.8 * r];

        obstacles.iter().any(|obstacle| {
            feet.iter().any(|offset| {
                let x = position.x + offset;
                let top = Vector2::new(x, position.y);
                let bottom = Vector2::new(x, reach_bottom);
                segment_intersects_polygon(top, bottom, &obstacle.polygon)
                    || point_in_polygon(bottom, &obstacle.polygon)
            })
        })
    }
}

/// Controls for one platformer step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlatformerInput {
    /// -1 left, 0 none, 1 right.
    pub horizontal: f32,
    pub jump: bool,
}

impl From<Direction> for PlatformerInput {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self {
                horizontal: -1.0,
                jump: false,
            },
            Direction::Right => Self {
                horizontal: 1.0,
                jump: false,
            },
            Direction::Up => Self {
                horizontal: 0.0,
                jump: true,
            },
            Direction::Down | Direction::Stop => Self::default(),
        }
    }
}

/// Gravity, ground contact and jumping for a single circle.
///
/// Jumps are buffered: a press shortly before landing still fires, and a
/// press shortly after leaving the ground (coyote time) is honoured. Holding
/// jump after take-off adds lift for a limited time, so tap and hold give
/// different heights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformerBody {
    pub velocity: Vector2,
    pub on_ground: bool,
    jump_hold: f32,
    coyote: f32,
    jump_buffer: f32,
    jump_was_held: bool,
}

impl PlatformerBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the body by `dt` seconds from `position` and returns the new
    /// position. The result stays inside the world and out of obstacles it
    /// was clear of.
    pub fn step(
        &mut self,
        position: Vector2,
        input: PlatformerInput,
        dt: f32,
        rules: &MovementRules,
        obstacles: &[StaticObject],
    ) -> Vector2 {
        let radius = rules.player_radius;
        self.velocity.x = input.horizontal.clamp(-1.0, 1.0) * rules.player_speed;
        self.velocity.y = (self.velocity.y + GRAVITY * dt).min(MAX_FALL_SPEED);

        let mut target = rules.clamp_inset(position + self.velocity * dt);
        if let Some(contact) = first_contact(position, target, radius, obstacles) {
            target = contact;
        }

        self.on_ground = false;
        let mut landed = false;
        let mut hit_ceiling = false;
        for obstacle in obstacles {
            if !circle_polygon_collision(target, radius, &obstacle.polygon) {
                continue;
            }
            let push = resolve_circle_polygon_collision(target, radius, &obstacle.polygon);
            target = target + push;
            if push.y < 0.0 {
                landed = true;
            } else if push.y > 0.0 && self.velocity.y < 0.0 {
                hit_ceiling = true;
            }
        }
        let resolved = rules.clamp_inset(target);

        if landed {
            self.velocity.y = 0.0;
            self.on_ground = true;
        }
        if hit_ceiling && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }

        // World floor and ceiling are solid
        if resolved.y >= rules.world_height - radius - SURFACE_EPSILON && self.velocity.y >= 0.0 {
            self.velocity.y = 0.0;
            self.on_ground = true;
        }
        if resolved.y <= radius + SURFACE_EPSILON && self.velocity.y < 0.0 {
            self.velocity.y = 0.0;
        }

        if !self.on_ground
            && self.velocity.y >= 0.0
            && rules.has_ground_support(resolved, obstacles)
        {
            self.velocity.y = 0.0;
            self.on_ground = true;
        }

        self.process_jump(input.jump, dt);
        resolved
    }

    fn process_jump(&mut self, jump: bool, dt: f32) {
        if jump && !self.jump_was_held {
            self.jump_buffer = JUMP_BUFFER_SECS;
        }

        if (self.on_ground || self.coyote > 0.0) && self.jump_buffer > 0.0 {
            self.velocity.y = -JUMP_INITIAL_SPEED;
            self.on_ground = false;
            self.jump_hold = 0.0;
            self.jump_buffer = 0.0;
            self.coyote = 0.0;
        }

        if jump && self.velocity.y < 0.0 && self.jump_hold < JUMP_MAX_HOLD_SECS {
            let hold = (JUMP_MAX_HOLD_SECS - self.jump_hold).min(dt);
            self.velocity.y -= JUMP_HOLD_ACCEL * hold;
            self.jump_hold += hold;
        }

        self.coyote = if self.on_ground {
            COYOTE_TIME_SECS
        } else {
            (self.coyote - dt).max(0.0)
        };
        self.jump_buffer = (self.jump_buffer - dt).max(0.0);
        self.jump_was_held = jump;
    }
}
