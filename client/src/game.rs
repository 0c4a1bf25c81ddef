use log::debug;
use shared::{
    default_obstacles, Direction, MovementRules, PlatformerBody, PlatformerInput, PlayerRecord,
    SinglePassResolver, StaticObject, Vector2,
};

/// The client's view of the world: the latest snapshot plus, in position
/// mode, the locally simulated position of our own player.
#[derive(Debug, Clone)]
pub struct ClientGameState {
    pub my_id: Option<String>,
    pub players: Vec<PlayerRecord>,
    pub snapshots_received: u64,
    local_position: Option<Vector2>,
    body: PlatformerBody,
    rules: MovementRules,
    obstacles: Vec<StaticObject>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::with_rules(MovementRules::default(), default_obstacles())
    }

    pub fn with_obstacles(obstacles: Vec<StaticObject>) -> Self {
        Self::with_rules(MovementRules::default(), obstacles)
    }

    /// Speed, radius and bounds must match the server's or it will disagree
    /// with our local steps.
    pub fn with_rules(rules: MovementRules, obstacles: Vec<StaticObject>) -> Self {
        Self {
            my_id: None,
            players: Vec::new(),
            snapshots_received: 0,
            local_position: None,
            body: PlatformerBody::new(),
            rules,
            obstacles,
        }
    }

    pub fn handle_welcome(&mut self, my_id: String, player: PlayerRecord) {
        self.local_position = Some(Vector2::new(player.x, player.y));
        self.body = PlatformerBody::new();
        self.my_id = Some(my_id);
    }

    pub fn apply_snapshot(&mut self, players: Vec<PlayerRecord>) {
        self.snapshots_received += 1;
        self.players = players;

        if self.local_position.is_none() {
            self.local_position = self.me().map(|me| Vector2::new(me.x, me.y));
        }
    }

    pub fn me(&self) -> Option<&PlayerRecord> {
        let id = self.my_id.as_deref()?;
        self.players.iter().find(|player| player.id == id)
    }

    pub fn local_position(&self) -> Option<Vector2> {
        self.local_position
    }

    pub fn rules(&self) -> &MovementRules {
        &self.rules
    }

    pub fn on_ground(&self) -> bool {
        self.body.on_ground
    }

    /// Moves our own circle the way the server's tick would, for the
    /// position model. Returns the new position, or `None` before the
    /// welcome has arrived.
    pub fn step_local(&mut self, direction: Direction, dt: f32) -> Option<Vector2> {
        let from = self.local_position?;
        let velocity = direction.velocity(self.rules.player_speed);
        let to = self
            .rules
            .step(from, velocity, dt, &self.obstacles, &SinglePassResolver);
        if to != from + velocity * dt {
            debug!("Local move adjusted to ({:.1}, {:.1})", to.x, to.y);
        }
        self.local_position = Some(to);
        Some(to)
    }

    /// Platformer flavour of [`step_local`](Self::step_local): left and right
    /// walk, up jumps, and gravity pulls toward the floor.
    pub fn step_platformer(&mut self, direction: Direction, dt: f32) -> Option<Vector2> {
        let from = self.local_position?;
        let to = self.body.step(
            from,
            PlatformerInput::from(direction),
            dt,
            &self.rules,
            &self.obstacles,
        );
        self.local_position = Some(to);
        Some(to)
    }

    /// Drops everything learned from the last connection.
    pub fn reset(&mut self) {
        self.my_id = None;
        self.players.clear();
        self.local_position = None;
        self.body = PlatformerBody::new();
    }
}

impl Default for ClientGameState {
    fn default() -> Self {
        Self::new()
    }
}
