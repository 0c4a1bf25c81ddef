//! Authoritative world state and the fixed-step simulation tick.

use crate::config::{MovementModel, ServerConfig};
use crate::utils::random_color;
use indexmap::IndexMap;
use log::{info, warn};
use rand::Rng;
use shared::{
    circle_polygon_collision, Direction, MovementRules, ObstacleResolver, PlayerRecord,
    SinglePassResolver, Vector2,
};
use std::time::{Duration, Instant};

/// Spawns land within +/- half of this around the world center.
const SPAWN_JITTER: f32 = 200.0;
const SPAWN_ATTEMPTS: usize = 16;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Vector2,
    /// World units per second.
    pub velocity: Vector2,
    pub color: String,
    /// Last join, input or position update. The tick never refreshes it.
    pub last_seen: Instant,
}

impl Player {
    pub fn new(id: String, name: String, position: Vector2, now: Instant) -> Self {
        Self {
            id,
            name,
            position,
            velocity: Vector2::ZERO,
            color: random_color(),
            last_seen: now,
        }
    }

    pub fn is_inactive(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }

    pub fn record(&self) -> PlayerRecord {
        PlayerRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            x: self.position.x,
            y: self.position.y,
            color: self.color.clone(),
            vx: self.velocity.x,
            vy: self.velocity.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Created,
    Reconnected,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Players whose position changed.
    pub moved: usize,
    /// Players removed for inactivity, in registry order.
    pub evicted: Vec<String>,
}

/// Player registry plus the static world it lives in.
///
/// Players are kept in insertion order; every player present at the start of
/// a tick is processed exactly once in that tick.
pub struct GameState {
    pub tick: u64,
    players: IndexMap<String, Player>,
    config: ServerConfig,
    rules: MovementRules,
    resolver: Box<dyn ObstacleResolver>,
}

impl GameState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_resolver(config, Box::new(SinglePassResolver))
    }

    pub fn with_resolver(config: ServerConfig, resolver: Box<dyn ObstacleResolver>) -> Self {
        for obstacle in &config.obstacles {
            if obstacle.polygon.len() < 3 {
                warn!(
                    "Obstacle {} has {} vertices and will never contain a player",
                    obstacle.id,
                    obstacle.polygon.len()
                );
            }
        }

        Self {
            tick: 0,
            players: IndexMap::new(),
            rules: config.movement_rules(),
            config,
            resolver,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Creates the player, or treats the join as a reconnect if the id is
    /// already registered. A reconnect renames the player, stops it and
    /// refreshes `last_seen` but keeps its position.
    pub fn join_player(&mut self, id: &str, name: String, now: Instant) -> JoinOutcome {
        if let Some(player) = self.players.get_mut(id) {
            player.name = name;
            player.velocity = Vector2::ZERO;
            player.last_seen = now;
            info!("Player reconnected {} ({})", id, player.name);
            return JoinOutcome::Reconnected;
        }

        let position = self.spawn_position();
        let player = Player::new(id.to_string(), name, position, now);
        info!(
            "Player created {} ({}) at ({:.1}, {:.1})",
            id, player.name, position.x, position.y
        );
        self.players.insert(id.to_string(), player);
        info!("Players online: {}", self.players.len());
        JoinOutcome::Created
    }

    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let removed = self.players.shift_remove(id);
        if let Some(player) = &removed {
            info!("Removed player {} ({})", id, player.name);
        }
        removed
    }

    /// Sets the player's velocity from a discrete direction.
    pub fn apply_direction(&mut self, id: &str, direction: Direction, now: Instant) -> bool {
        let speed = self.config.player_speed;
        match self.players.get_mut(id) {
            Some(player) => {
                player.velocity = direction.velocity(speed);
                player.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Accepts a client-simulated position after clamping it to the world and
    /// pushing it out of obstacles. Velocity is left untouched.
    pub fn apply_position(&mut self, id: &str, reported: Vector2, now: Instant) -> bool {
        if !reported.is_finite() || !self.players.contains_key(id) {
            return false;
        }

        let constrained = self
            .rules
            .constrain(reported, &self.config.obstacles, self.resolver.as_ref());
        match self.players.get_mut(id) {
            Some(player) => {
                player.position = constrained;
                player.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Advances the world by one fixed step.
    ///
    /// For each player in registry order: evict if inactive, otherwise
    /// integrate velocity over the tick period, clamp to the world, cut the
    /// move at the first obstacle it enters, then resolve obstacle overlap
    /// and clamp again.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        let Self {
            players,
            config,
            rules,
            resolver,
            ..
        } = self;
        let config: &ServerConfig = config;
        let rules: &MovementRules = rules;
        let resolver: &dyn ObstacleResolver = &**resolver;
        let dt = config.tick_period().as_secs_f32();

        players.retain(|id, player| {
            if player.is_inactive(now, config.inactivity_timeout) {
                info!("Removed inactive player {} ({})", id, player.name);
                report.evicted.push(id.clone());
                return false;
            }

            let from = player.position;
            let to = rules.step(from, player.velocity, dt, &config.obstacles, resolver);
            if to != from {
                report.moved += 1;
            }
            player.position = to;
            true
        });

        report
    }

    pub fn snapshot(&self) -> Vec<PlayerRecord> {
        self.players.values().map(Player::record).collect()
    }

    fn spawn_position(&self) -> Vector2 {
        let obstacles = &self.config.obstacles;
        if self.config.movement_model == MovementModel::Platformer {
            return self
                .rules
                .constrain(self.rules.platform_spawn(), obstacles, self.resolver.as_ref());
        }

        let (width, height) = (self.config.world_width, self.config.world_height);
        let center = Vector2::new(width / 2.0, height / 2.0);
        let mut rng = rand::thread_rng();

        let mut candidate = center;
        for _ in 0..SPAWN_ATTEMPTS {
            candidate = Vector2::new(
                center.x + (rng.gen::<f32>() - 0.5) * SPAWN_JITTER,
                center.y + (rng.gen::<f32>() - 0.5) * SPAWN_JITTER,
            )
            .clamp_to_bounds(width, height);

            let blocked = obstacles.iter().any(|obstacle| {
                circle_polygon_collision(candidate, self.config.player_radius, &obstacle.polygon)
            });
            if !blocked {
                return candidate;
            }
        }

        self.rules.constrain(candidate, obstacles, self.resolver.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{RenderStyle, StaticObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn open_world() -> ServerConfig {
        ServerConfig {
            obstacles: Vec::new(),
            ..ServerConfig::default()
        }
    }

    fn world_with(obstacles: Vec<StaticObject>) -> ServerConfig {
        ServerConfig {
            obstacles,
            ..ServerConfig::default()
        }
    }

    fn rect(id: &str, x: f32, y: f32, w: f32, h: f32) -> StaticObject {
        StaticObject::new(
            id,
            &[(x, y), (x + w, y), (x + w, y + h), (x, y + h)],
            RenderStyle::StoneWall,
        )
    }

    fn place(game: &mut GameState, id: &str, position: Vector2, velocity: Vector2) {
        let player = game.players.get_mut(id).unwrap();
        player.position = position;
        player.velocity = velocity;
    }

    #[test]
    fn test_join_creates_player_near_center() {
        let mut game = GameState::new(open_world());
        let now = Instant::now();

        let outcome = game.join_player("player-a", "Alice".to_string(), now);

        assert_eq!(outcome, JoinOutcome::Created);
        let player = game.player("player-a").unwrap();
        assert_eq!(player.name, "Alice");
        assert_eq!(player.velocity, Vector2::ZERO);
        assert_eq!(player.last_seen, now);
        assert!((700.0..=900.0).contains(&player.position.x));
        assert!((350.0..=550.0).contains(&player.position.y));
        assert!(player.color.starts_with("hsl("));
    }

    #[test]
    fn test_spawn_avoids_obstacles() {
        // Block most of the spawn area, leaving a gap on the right
        let config = world_with(vec![rect("block", 690.0, 340.0, 180.0, 220.0)]);
        let mut game = GameState::new(config);

        for i in 0..20 {
            let id = format!("player-{}", i);
            game.join_player(&id, "P".to_string(), Instant::now());
            let position = game.player(&id).unwrap().position;
            assert!(
                !circle_polygon_collision(
                    position,
                    game.config().player_radius,
                    &game.config().obstacles[0].polygon
                ),
                "spawned inside obstacle at {:?}",
                position
            );
        }
    }

    #[test]
    fn test_reconnect_preserves_position() {
        let mut game = GameState::new(open_world());
        let start = Instant::now();
        game.join_player("player-a", "Alice".to_string(), start);
        place(
            &mut game,
            "player-a",
            Vector2::new(42.0, 24.0),
            Vector2::new(280.0, 0.0),
        );

        let later = start + Duration::from_secs(5);
        let outcome = game.join_player("player-a", "Alicia".to_string(), later);

        assert_eq!(outcome, JoinOutcome::Reconnected);
        let player = game.player("player-a").unwrap();
        assert_eq!(player.position, Vector2::new(42.0, 24.0));
        assert_eq!(player.velocity, Vector2::ZERO);
        assert_eq!(player.last_seen, later);
        assert_eq!(player.name, "Alicia");
        assert_eq!(game.player_count(), 1);
    }

    #[test]
    fn test_tick_integrates_velocity_over_period() {
        let mut game = GameState::new(open_world());
        let now = Instant::now();
        game.join_player("player-a", "Alice".to_string(), now);
        place(
            &mut game,
            "player-a",
            Vector2::new(100.0, 100.0),
            Vector2::new(200.0, 0.0),
        );

        let report = game.tick(now);

        let player = game.player("player-a").unwrap();
        assert_approx_eq!(player.position.x, 110.0, 1e-3);
        assert_eq!(player.position.y, 100.0);
        assert_eq!(report.tick, 1);
        assert_eq!(report.moved, 1);
        assert!(report.evicted.is_empty());
    }

    #[test]
    fn test_tick_clamps_to_world_bounds() {
        let mut game = GameState::new(open_world());
        let now = Instant::now();
        game.join_player("player-a", "A".to_string(), now);
        game.join_player("player-b", "B".to_string(), now);
        place(
            &mut game,
            "player-a",
            Vector2::new(5.0, 450.0),
            Vector2::new(-280.0, 0.0),
        );
        place(
            &mut game,
            "player-b",
            Vector2::new(800.0, 895.0),
            Vector2::new(0.0, 280.0),
        );

        game.tick(now);

        assert_eq!(game.player("player-a").unwrap().position, Vector2::new(0.0, 450.0));
        assert_eq!(game.player("player-b").unwrap().position, Vector2::new(800.0, 900.0));

        // Pinned against the wall: no further movement
        let report = game.tick(now);
        assert_eq!(report.moved, 0);
    }

    #[test]
    fn test_bounds_hold_under_random_input() {
        let mut game = GameState::new(ServerConfig::default());
        let start = Instant::now();
        let mut rng = rand::thread_rng();
        for i in 0..8 {
            game.join_player(&format!("player-{}", i), "P".to_string(), start);
        }

        let config = game.config().clone();
        for step in 0..400u64 {
            let now = start + Duration::from_millis(step * 50);
            for i in 0..8 {
                if rng.gen_bool(0.2) {
                    let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
                    game.apply_direction(&format!("player-{}", i), direction, now);
                }
            }
            game.tick(now);

            for player in game.players() {
                assert!((0.0..=config.world_width).contains(&player.position.x));
                assert!((0.0..=config.world_height).contains(&player.position.y));
            }
        }
    }

    #[test]
    fn test_apply_direction() {
        let mut game = GameState::new(open_world());
        let start = Instant::now();
        game.join_player("player-a", "A".to_string(), start);

        let later = start + Duration::from_secs(1);
        assert!(game.apply_direction("player-a", Direction::Up, later));
        let player = game.player("player-a").unwrap();
        assert_eq!(player.velocity, Vector2::new(0.0, -280.0));
        assert_eq!(player.last_seen, later);

        assert!(game.apply_direction("player-a", Direction::Stop, later));
        assert_eq!(game.player("player-a").unwrap().velocity, Vector2::ZERO);

        assert!(!game.apply_direction("player-missing", Direction::Up, later));
    }

    #[test]
    fn test_inactive_player_evicted_after_timeout() {
        let mut game = GameState::new(open_world());
        let start = Instant::now();
        game.join_player("player-a", "A".to_string(), start);
        game.join_player("player-b", "B".to_string(), start);
        game.apply_direction("player-b", Direction::Left, start + Duration::from_secs(30));

        let at_timeout = game.tick(start + Duration::from_secs(60));
        assert!(at_timeout.evicted.is_empty());

        let report = game.tick(start + Duration::from_millis(60_050));
        assert_eq!(report.evicted, vec!["player-a".to_string()]);
        assert!(!game.contains("player-a"));
        assert!(game.contains("player-b"));
    }

    #[test]
    fn test_tick_does_not_refresh_last_seen() {
        let mut game = GameState::new(open_world());
        let start = Instant::now();
        game.join_player("player-a", "A".to_string(), start);
        game.apply_direction("player-a", Direction::Right, start);

        for step in 1..=10 {
            game.tick(start + Duration::from_secs(step));
        }
        assert_eq!(game.player("player-a").unwrap().last_seen, start);
    }

    #[test]
    fn test_obstacle_pushes_player_out() {
        let mut game = GameState::new(world_with(vec![rect("box", 200.0, 400.0, 100.0, 100.0)]));
        let now = Instant::now();
        game.join_player("player-a", "A".to_string(), now);
        place(
            &mut game,
            "player-a",
            Vector2::new(180.0, 450.0),
            Vector2::new(280.0, 0.0),
        );

        for _ in 0..10 {
            game.tick(now);
            let position = game.player("player-a").unwrap().position;
            assert!(
                !circle_polygon_collision(position, 16.0, &game.config().obstacles[0].polygon),
                "player overlapping obstacle at {:?}",
                position
            );
        }
        assert!(game.player("player-a").unwrap().position.x < 200.0);
    }

    fn assert_stays_left_of_wall(game: &GameState) {
        let position = game.player("player-a").unwrap().position;
        assert!(position.x < 200.0, "crossed the wall to {:?}", position);
        assert!(!circle_polygon_collision(
            position,
            game.config().player_radius,
            &game.config().obstacles[0].polygon
        ));
    }

    #[test]
    fn test_fast_player_does_not_tunnel_through_thin_wall() {
        let config = ServerConfig {
            player_speed: 2000.0,
            ..world_with(vec![rect("wall", 200.0, 0.0, 4.0, 900.0)])
        };
        let mut game = GameState::new(config);
        let now = Instant::now();
        game.join_player("player-a", "A".to_string(), now);
        place(&mut game, "player-a", Vector2::new(150.0, 450.0), Vector2::ZERO);
        game.apply_direction("player-a", Direction::Right, now);

        for _ in 0..5 {
            game.tick(now);
            assert_stays_left_of_wall(&game);
        }
    }

    #[test]
    fn test_move_ending_on_far_edge_of_thin_wall_is_stopped() {
        let config = ServerConfig {
            player_speed: 600.0,
            ..world_with(vec![rect("wall", 200.0, 0.0, 4.0, 900.0)])
        };
        let mut game = GameState::new(config);
        let now = Instant::now();
        game.join_player("player-a", "A".to_string(), now);
        // One tick moves 30 units, landing within a radius of the far edge
        place(&mut game, "player-a", Vector2::new(183.5, 450.0), Vector2::ZERO);
        game.apply_direction("player-a", Direction::Right, now);

        game.tick(now);

        assert_stays_left_of_wall(&game);
    }

    #[test]
    fn test_platformer_players_spawn_on_the_floor() {
        let config = ServerConfig {
            movement_model: MovementModel::Platformer,
            ..ServerConfig::default()
        };
        let mut game = GameState::new(config);
        let now = Instant::now();
        game.join_player("player-a", "A".to_string(), now);
        game.join_player("player-b", "B".to_string(), now);

        let a = game.player("player-a").unwrap().position;
        let b = game.player("player-b").unwrap().position;
        assert_eq!(a, b);
        assert_eq!(a, game.config().movement_rules().platform_spawn());
        assert_eq!(a.y, 900.0 - 16.0);
    }

    #[test]
    fn test_apply_position_clamps_and_resolves() {
        let mut game = GameState::new(world_with(vec![rect("box", 200.0, 400.0, 100.0, 100.0)]));
        let start = Instant::now();
        game.join_player("player-a", "A".to_string(), start);

        let later = start + Duration::from_secs(2);
        assert!(game.apply_position("player-a", Vector2::new(-50.0, 2000.0), later));
        let player = game.player("player-a").unwrap();
        assert_eq!(player.position, Vector2::new(0.0, 900.0));
        assert_eq!(player.velocity, Vector2::ZERO);
        assert_eq!(player.last_seen, later);

        assert!(game.apply_position("player-a", Vector2::new(190.0, 450.0), later));
        let position = game.player("player-a").unwrap().position;
        assert!(!circle_polygon_collision(position, 16.0, &game.config().obstacles[0].polygon));

        assert!(!game.apply_position("player-a", Vector2::new(f32::NAN, 1.0), later));
        assert!(!game.apply_position("player-missing", Vector2::new(1.0, 1.0), later));
    }

    #[test]
    fn test_snapshot_keeps_insertion_order() {
        let mut game = GameState::new(open_world());
        let now = Instant::now();
        for id in ["player-c", "player-a", "player-b"] {
            game.join_player(id, id.to_string(), now);
        }
        game.remove_player("player-a");
        game.join_player("player-d", "D".to_string(), now);

        let ids: Vec<String> = game.snapshot().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["player-c", "player-b", "player-d"]);
    }

    #[test]
    fn test_remove_player_twice() {
        let mut game = GameState::new(open_world());
        game.join_player("player-a", "A".to_string(), Instant::now());
        assert!(game.remove_player("player-a").is_some());
        assert!(game.remove_player("player-a").is_none());
    }

    struct CountingResolver(Arc<AtomicUsize>);

    impl ObstacleResolver for CountingResolver {
        fn resolve(
            &self,
            center: Vector2,
            _radius: f32,
            _obstacles: &[StaticObject],
        ) -> Vector2 {
            self.0.fetch_add(1, Ordering::SeqCst);
            center
        }
    }

    #[test]
    fn test_custom_resolver_used_once_per_player_per_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = world_with(vec![rect("far", 10.0, 10.0, 5.0, 5.0)]);
        let mut game = GameState::with_resolver(config, Box::new(CountingResolver(calls.clone())));
        let now = Instant::now();
        game.join_player("player-a", "A".to_string(), now);
        game.join_player("player-b", "B".to_string(), now);
        let after_spawn = calls.load(Ordering::SeqCst);

        game.tick(now);

        assert_eq!(calls.load(Ordering::SeqCst) - after_spawn, 2);
    }
}
