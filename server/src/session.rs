//! Session and identity management.
//!
//! Binds transient WebSocket connections to stable player ids and owns the
//! world. Two side tables are kept in lockstep:
//! - `owners`: connection -> player id, the back-reference used for cleanup
//! - `sockets`: player id -> the connection that currently owns it
//!
//! Every mutation of either table happens inside one `&mut self` call, so no
//! caller can observe a player owned by two connections or a half-removed
//! player.

use crate::config::{BroadcastPolicy, ServerConfig};
use crate::connection::{ConnectionHandle, ConnectionId};
use crate::game::{GameState, JoinOutcome, TickReport};
use crate::utils::{generate_player_id, resolve_client_id, sanitize_chat, sanitize_name};
use log::{debug, info, warn};
use serde_json::Value;
use shared::{ClientMessage, CloseReason, Direction, ServerMessage, Vector2};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub players: usize,
    pub connections: usize,
    /// Connections that own a player.
    pub bound: usize,
    pub tick: u64,
}

/// Result of one tick at the session level.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub report: TickReport,
    /// Connections the snapshot was queued for; zero if nothing was sent.
    pub recipients: usize,
}

pub struct SessionManager {
    game: GameState,
    connections: HashMap<ConnectionId, ConnectionHandle>,
    owners: HashMap<ConnectionId, String>,
    sockets: HashMap<String, ConnectionId>,
    /// Set when the roster changes outside the tick; read by `OnChange`.
    roster_dirty: bool,
}

impl SessionManager {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_game(GameState::new(config))
    }

    pub fn with_game(game: GameState) -> Self {
        Self {
            game,
            connections: HashMap::new(),
            owners: HashMap::new(),
            sockets: HashMap::new(),
            roster_dirty: false,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn owner_of(&self, player_id: &str) -> Option<ConnectionId> {
        self.sockets.get(player_id).copied()
    }

    pub fn player_for(&self, connection: ConnectionId) -> Option<&str> {
        self.owners.get(&connection).map(String::as_str)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            players: self.game.player_count(),
            connections: self.connections.len(),
            bound: self.sockets.len(),
            tick: self.game.tick,
        }
    }

    pub fn register_connection(&mut self, handle: ConnectionHandle) {
        debug!("Connection {} opened from {}", handle.id, handle.addr);
        self.connections.insert(handle.id, handle);
    }

    /// Decodes and dispatches one inbound text frame. Frames that do not
    /// parse, or carry an unknown type, are dropped.
    pub fn handle_message(&mut self, connection: ConnectionId, text: &str, now: Instant) {
        let message = match ClientMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                debug!("Ignoring malformed frame from {}: {}", connection, e);
                return;
            }
        };

        match message {
            ClientMessage::Join { name, client_id } => {
                self.handle_join(connection, client_id.as_ref(), name.as_ref(), now);
            }
            ClientMessage::Input { direction } => {
                self.handle_input(connection, direction.as_ref(), now);
            }
            ClientMessage::Position { x, y } => {
                self.handle_position(connection, Vector2::new(x, y), now);
            }
            ClientMessage::Chat { message } => {
                self.handle_chat(connection, &message);
            }
        }
    }

    /// Binds `connection` to a player id and greets it.
    ///
    /// `requested_id` is trusted if it has the shape of a player id: any
    /// client can resume any well-formed id. A prior owner of that id is
    /// unbound and closed with [`CloseReason::Replaced`] before the new
    /// binding is written.
    pub fn handle_join(
        &mut self,
        connection: ConnectionId,
        requested_id: Option<&Value>,
        raw_name: Option<&Value>,
        now: Instant,
    ) -> Option<String> {
        let Some(handle) = self.connections.get(&connection).cloned() else {
            debug!("Ignoring join from unknown connection {}", connection);
            return None;
        };

        let name = sanitize_name(raw_name);
        let player_id = match resolve_client_id(requested_id) {
            Some(id) => id,
            None => self.mint_player_id(),
        };

        // A connection owns at most one player.
        if let Some(previous) = self.owners.get(&connection).cloned() {
            if previous != player_id {
                info!("{} switched from {} to {}", connection, previous, player_id);
                self.owners.remove(&connection);
                self.sockets.remove(&previous);
                self.game.remove_player(&previous);
            }
        }

        if let Some(prior) = self.sockets.get(&player_id).copied() {
            if prior != connection {
                self.owners.remove(&prior);
                if let Some(old) = self.connections.remove(&prior) {
                    info!(
                        "Player {} taken over by {}, closing {}",
                        player_id, connection, prior
                    );
                    old.close(CloseReason::Replaced);
                }
            }
        }

        self.sockets.insert(player_id.clone(), connection);
        self.owners.insert(connection, player_id.clone());

        if self.game.join_player(&player_id, name, now) == JoinOutcome::Created {
            self.roster_dirty = true;
        }

        if let Some(player) = self.game.player(&player_id) {
            handle.send(&ServerMessage::Welcome {
                my_id: player_id.clone(),
                player: player.record(),
            });
        }
        handle.send(&self.snapshot_message());

        Some(player_id)
    }

    /// Applies a direction in the velocity model. Returns false if ignored.
    pub fn handle_input(
        &mut self,
        connection: ConnectionId,
        direction: Option<&Value>,
        now: Instant,
    ) -> bool {
        if self.game.config().movement_model.reports_positions() {
            debug!("Ignoring input from {}: server expects positions", connection);
            return false;
        }
        let Some(player_id) = self.owners.get(&connection) else {
            debug!("Ignoring input from unbound connection {}", connection);
            return false;
        };
        let Some(direction) = direction.and_then(Direction::from_value) else {
            debug!("Ignoring invalid direction from {}", connection);
            return false;
        };

        self.game.apply_direction(player_id, direction, now)
    }

    /// Applies a reported position in the position or platformer model.
    /// Returns false if ignored.
    pub fn handle_position(
        &mut self,
        connection: ConnectionId,
        position: Vector2,
        now: Instant,
    ) -> bool {
        if !self.game.config().movement_model.reports_positions() {
            debug!("Ignoring position from {}: server runs the velocity model", connection);
            return false;
        }
        let Some(player_id) = self.owners.get(&connection) else {
            debug!("Ignoring position from unbound connection {}", connection);
            return false;
        };

        let accepted = self.game.apply_position(player_id, position, now);
        if accepted {
            // Position updates bypass the tick's movement counter.
            self.roster_dirty = true;
        }
        accepted
    }

    /// Relays a chat line to every joined connection. Does not touch the
    /// simulation.
    pub fn handle_chat(&mut self, connection: ConnectionId, message: &str) -> usize {
        let Some(player) = self
            .owners
            .get(&connection)
            .and_then(|id| self.game.player(id))
        else {
            debug!("Ignoring chat from unbound connection {}", connection);
            return 0;
        };
        let Some(message) = sanitize_chat(message) else {
            return 0;
        };

        info!("[chat] {}: {}", player.name, message);
        let relay = ServerMessage::Chat {
            from: player.name.clone(),
            message,
        };
        self.broadcast(&relay)
    }

    /// Unbinds a closed connection and removes its player, but only if the
    /// connection still owns that player. A stale close from a replaced
    /// connection is a no-op. Safe to call more than once.
    pub fn handle_disconnect(&mut self, connection: ConnectionId) -> Option<String> {
        self.connections.remove(&connection);

        let Some(player_id) = self.owners.remove(&connection) else {
            debug!("Connection {} closed without a player", connection);
            return None;
        };
        if self.sockets.get(&player_id) != Some(&connection) {
            return None;
        }

        self.sockets.remove(&player_id);
        self.game.remove_player(&player_id);
        self.roster_dirty = true;
        info!("Player {} left ({} closed)", player_id, connection);
        Some(player_id)
    }

    /// Runs one simulation step, closes connections of evicted players with
    /// [`CloseReason::Inactive`], then broadcasts according to the policy.
    pub fn run_tick(&mut self, now: Instant) -> TickSummary {
        let report = self.game.tick(now);

        for player_id in &report.evicted {
            let Some(connection) = self.sockets.remove(player_id) else {
                continue;
            };
            self.owners.remove(&connection);
            if let Some(handle) = self.connections.remove(&connection) {
                info!("Closing {} for inactive player {}", connection, player_id);
                handle.close(CloseReason::Inactive);
            }
        }

        let changed = report.moved > 0 || !report.evicted.is_empty() || self.roster_dirty;
        let should_broadcast = match self.game.config().broadcast_policy {
            BroadcastPolicy::Always => true,
            BroadcastPolicy::OnChange => changed,
        };

        let recipients = if should_broadcast && !self.sockets.is_empty() {
            self.roster_dirty = false;
            self.broadcast_snapshot()
        } else {
            0
        };

        TickSummary { report, recipients }
    }

    /// Sends the full snapshot to every joined connection. Returns the
    /// number of connections it was queued for.
    pub fn broadcast_snapshot(&self) -> usize {
        self.broadcast(&self.snapshot_message())
    }

    /// Queues `message` for connections that own a player. A connection that
    /// has not joined yet hears nothing until its welcome.
    fn broadcast(&self, message: &ServerMessage) -> usize {
        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode broadcast: {}", e);
                return 0;
            }
        };

        self.sockets
            .values()
            .filter_map(|connection| self.connections.get(connection))
            .filter(|handle| handle.send_text(text.clone()))
            .count()
    }

    fn snapshot_message(&self) -> ServerMessage {
        ServerMessage::GameState {
            players: self.game.snapshot(),
        }
    }

    fn mint_player_id(&self) -> String {
        loop {
            let id = generate_player_id();
            if !self.game.contains(&id) && !self.sockets.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MovementModel;
    use crate::connection::Outbound;
    use shared::PlayerRecord;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn open_world() -> ServerConfig {
        ServerConfig {
            obstacles: Vec::new(),
            ..ServerConfig::default()
        }
    }

    fn connect(
        session: &mut SessionManager,
        id: u64,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50000 + id as u16);
        let conn = ConnectionId(id);
        session.register_connection(ConnectionHandle::new(conn, addr, tx));
        (conn, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn messages(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<ServerMessage> {
        drain(rx)
            .into_iter()
            .filter_map(|frame| match frame {
                Outbound::Text(text) => Some(ServerMessage::decode(&text).unwrap()),
                Outbound::Close(_) => None,
            })
            .collect()
    }

    fn last_snapshot(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<PlayerRecord> {
        messages(rx)
            .into_iter()
            .rev()
            .find_map(|msg| match msg {
                ServerMessage::GameState { players } => Some(players),
                _ => None,
            })
            .expect("no snapshot received")
    }

    fn join(
        session: &mut SessionManager,
        conn: ConnectionId,
        name: &str,
        client_id: Option<&str>,
        now: Instant,
    ) -> String {
        let frame = ClientMessage::join(name, client_id).encode().unwrap();
        session.handle_message(conn, &frame, now);
        session.player_for(conn).unwrap().to_string()
    }

    #[test]
    fn test_join_sends_welcome_then_snapshot() {
        let mut session = SessionManager::new(open_world());
        let (conn, mut rx) = connect(&mut session, 1);

        let id = join(&mut session, conn, "Alice", None, Instant::now());

        let received = messages(&mut rx);
        assert_eq!(received.len(), 2);
        match &received[0] {
            ServerMessage::Welcome { my_id, player } => {
                assert_eq!(my_id, &id);
                assert_eq!(player.name, "Alice");
                assert_eq!((player.vx, player.vy), (0.0, 0.0));
            }
            other => panic!("Expected welcome, got {:?}", other),
        }
        match &received[1] {
            ServerMessage::GameState { players } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, id);
            }
            other => panic!("Expected gameState, got {:?}", other),
        }
        assert!(id.starts_with("player-"));
    }

    #[test]
    fn test_two_joins_then_tick_broadcasts_both() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (alice_conn, mut alice_rx) = connect(&mut session, 1);
        let (bob_conn, mut bob_rx) = connect(&mut session, 2);

        let alice = join(&mut session, alice_conn, "Alice", None, now);
        let bob = join(&mut session, bob_conn, "Bob", None, now);
        assert_ne!(alice, bob);
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        let summary = session.run_tick(now + Duration::from_millis(50));
        assert_eq!(summary.recipients, 2);

        for rx in [&mut alice_rx, &mut bob_rx] {
            let players = last_snapshot(rx);
            assert_eq!(players.len(), 2);
            for player in &players {
                assert!((0.0..=1600.0).contains(&player.x));
                assert!((0.0..=900.0).contains(&player.y));
            }
        }
    }

    #[test]
    fn test_join_from_unregistered_connection_ignored() {
        let mut session = SessionManager::new(open_world());
        let result = session.handle_join(
            ConnectionId(99),
            None,
            Some(&Value::from("Ghost")),
            Instant::now(),
        );
        assert_eq!(result, None);
        assert_eq!(session.stats().players, 0);
    }

    #[test]
    fn test_join_sanitizes_name_and_rejects_bad_client_id() {
        let mut session = SessionManager::new(open_world());
        let (conn, mut rx) = connect(&mut session, 1);

        session.handle_message(
            conn,
            r#"{"type":"join","name":123,"clientId":"admin"}"#,
            Instant::now(),
        );

        let id = session.player_for(conn).unwrap().to_string();
        assert!(id.starts_with("player-"));
        assert_ne!(id, "admin");
        assert_eq!(session.game().player(&id).unwrap().name, "Anonymous");
        assert!(matches!(messages(&mut rx)[0], ServerMessage::Welcome { .. }));
    }

    #[test]
    fn test_replacement_is_atomic() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (conn_a, mut rx_a) = connect(&mut session, 1);
        let (conn_b, mut rx_b) = connect(&mut session, 2);

        join(&mut session, conn_a, "Alice", Some("player-abc123"), now);
        drain(&mut rx_a);

        let id = join(&mut session, conn_b, "Alice", Some("player-abc123"), now);
        assert_eq!(id, "player-abc123");

        // Old connection closed as replaced, new one is the sole owner
        assert_eq!(drain(&mut rx_a), vec![Outbound::Close(CloseReason::Replaced)]);
        assert_eq!(session.owner_of("player-abc123"), Some(conn_b));
        assert_eq!(session.player_for(conn_a), None);
        assert!(matches!(messages(&mut rx_b)[0], ServerMessage::Welcome { .. }));

        // The stale close must not remove the live player
        assert_eq!(session.handle_disconnect(conn_a), None);
        assert!(session.game().contains("player-abc123"));
        let stats = session.stats();
        assert_eq!((stats.players, stats.connections, stats.bound), (1, 1, 1));
    }

    #[test]
    fn test_replacement_preserves_position() {
        let mut session = SessionManager::new(open_world());
        let start = Instant::now();
        let (conn_a, _rx_a) = connect(&mut session, 1);
        let (conn_b, _rx_b) = connect(&mut session, 2);

        let id = join(&mut session, conn_a, "Alice", Some("player-keep"), start);
        session.handle_message(conn_a, r#"{"type":"input","direction":"right"}"#, start);
        session.run_tick(start);
        let before = session.game().player(&id).unwrap().position;

        let later = start + Duration::from_secs(1);
        join(&mut session, conn_b, "Alice", Some("player-keep"), later);

        let player = session.game().player(&id).unwrap();
        assert_eq!(player.position, before);
        assert_eq!(player.velocity, Vector2::ZERO);
        assert_eq!(player.last_seen, later);
    }

    #[test]
    fn test_rejoin_with_other_id_releases_previous_player() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (conn, _rx) = connect(&mut session, 1);

        join(&mut session, conn, "Alice", Some("player-first"), now);
        join(&mut session, conn, "Alice", Some("player-second"), now);

        assert!(!session.game().contains("player-first"));
        assert_eq!(session.owner_of("player-first"), None);
        assert_eq!(session.owner_of("player-second"), Some(conn));
        assert_eq!(session.stats().players, 1);
    }

    #[test]
    fn test_input_updates_velocity_and_ignores_garbage() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (conn, _rx) = connect(&mut session, 1);
        let (stranger, _rx2) = connect(&mut session, 2);
        let id = join(&mut session, conn, "Alice", None, now);

        session.handle_message(conn, r#"{"type":"input","direction":"up"}"#, now);
        assert_eq!(
            session.game().player(&id).unwrap().velocity,
            Vector2::new(0.0, -280.0)
        );

        for frame in [
            "not json",
            r#"{"type":"input","direction":"sideways"}"#,
            r#"{"type":"input","direction":5}"#,
            r#"{"type":"input"}"#,
            r#"{"type":"warp","x":1}"#,
        ] {
            session.handle_message(conn, frame, now);
        }
        assert_eq!(
            session.game().player(&id).unwrap().velocity,
            Vector2::new(0.0, -280.0)
        );

        // No session on this connection yet
        let direction = Value::from("down");
        assert!(!session.handle_input(stranger, Some(&direction), now));
    }

    #[test]
    fn test_inactive_player_evicted_and_closed() {
        let mut session = SessionManager::new(open_world());
        let start = Instant::now();
        let (conn, mut rx) = connect(&mut session, 1);
        let id = join(&mut session, conn, "Idle", None, start);
        drain(&mut rx);

        let summary = session.run_tick(start + Duration::from_secs(61));

        assert_eq!(summary.report.evicted, vec![id.clone()]);
        assert!(drain(&mut rx).contains(&Outbound::Close(CloseReason::Inactive)));
        assert_eq!(session.owner_of(&id), None);
        assert_eq!(session.stats().connections, 0);

        // The transport reports the close afterwards
        assert_eq!(session.handle_disconnect(conn), None);
    }

    #[test]
    fn test_disconnect_then_tick_does_not_double_remove() {
        let mut session = SessionManager::new(open_world());
        let start = Instant::now();
        let (conn, _rx) = connect(&mut session, 1);
        let id = join(&mut session, conn, "Alice", None, start);
        session.handle_message(conn, r#"{"type":"input","direction":"up"}"#, start);

        assert_eq!(session.handle_disconnect(conn), Some(id.clone()));
        assert!(!session.game().contains(&id));
        assert_eq!(session.handle_disconnect(conn), None);

        let summary = session.run_tick(start + Duration::from_secs(120));
        assert!(summary.report.evicted.is_empty());
        assert_eq!(summary.recipients, 0);
    }

    #[test]
    fn test_position_model() {
        let config = ServerConfig {
            movement_model: MovementModel::Position,
            ..open_world()
        };
        let mut session = SessionManager::new(config);
        let now = Instant::now();
        let (conn, _rx) = connect(&mut session, 1);
        let id = join(&mut session, conn, "Alice", None, now);

        session.handle_message(conn, r#"{"type":"input","direction":"up"}"#, now);
        assert_eq!(session.game().player(&id).unwrap().velocity, Vector2::ZERO);

        session.handle_message(conn, r#"{"type":"position","x":2000,"y":120.5}"#, now);
        assert_eq!(
            session.game().player(&id).unwrap().position,
            Vector2::new(1600.0, 120.5)
        );
    }

    #[test]
    fn test_position_ignored_in_velocity_model() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (conn, _rx) = connect(&mut session, 1);
        let id = join(&mut session, conn, "Alice", None, now);
        let before = session.game().player(&id).unwrap().position;

        assert!(!session.handle_position(conn, Vector2::new(5.0, 5.0), now));
        assert_eq!(session.game().player(&id).unwrap().position, before);
    }

    #[test]
    fn test_on_change_policy_skips_idle_ticks() {
        let config = ServerConfig {
            broadcast_policy: BroadcastPolicy::OnChange,
            ..open_world()
        };
        let mut session = SessionManager::new(config);
        let now = Instant::now();
        let (conn, mut rx) = connect(&mut session, 1);
        join(&mut session, conn, "Alice", None, now);
        drain(&mut rx);

        // The join itself is a change
        assert_eq!(session.run_tick(now).recipients, 1);
        assert_eq!(session.run_tick(now).recipients, 0);
        assert!(drain(&mut rx).len() == 1);

        session.handle_message(conn, r#"{"type":"input","direction":"left"}"#, now);
        assert_eq!(session.run_tick(now).recipients, 1);
    }

    #[test]
    fn test_unjoined_connection_hears_nothing_before_welcome() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (alice, mut alice_rx) = connect(&mut session, 1);
        let (lurker, mut lurker_rx) = connect(&mut session, 2);

        assert_eq!(session.run_tick(now).recipients, 0);
        join(&mut session, alice, "Alice", None, now);
        session.handle_message(alice, r#"{"type":"chat","message":"hi"}"#, now);
        assert_eq!(session.run_tick(now).recipients, 1);
        assert!(drain(&mut lurker_rx).is_empty());
        assert_eq!(last_snapshot(&mut alice_rx).len(), 1);

        join(&mut session, lurker, "Late", None, now);
        assert!(matches!(
            messages(&mut lurker_rx)[0],
            ServerMessage::Welcome { .. }
        ));
    }

    #[test]
    fn test_platformer_accepts_positions_and_ignores_input() {
        let config = ServerConfig {
            movement_model: MovementModel::Platformer,
            ..open_world()
        };
        let mut session = SessionManager::new(config);
        let now = Instant::now();
        let (conn, _rx) = connect(&mut session, 1);
        let id = join(&mut session, conn, "Jumper", None, now);
        assert_eq!(session.game().player(&id).unwrap().position, Vector2::new(80.0, 884.0));

        session.handle_message(conn, r#"{"type":"input","direction":"right"}"#, now);
        assert_eq!(session.game().player(&id).unwrap().velocity, Vector2::ZERO);

        assert!(session.handle_position(conn, Vector2::new(120.0, 700.0), now));
        assert_eq!(
            session.game().player(&id).unwrap().position,
            Vector2::new(120.0, 700.0)
        );
    }

    #[test]
    fn test_chat_relayed_to_everyone() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (alice, mut alice_rx) = connect(&mut session, 1);
        let (bob, mut bob_rx) = connect(&mut session, 2);
        join(&mut session, alice, "Alice", None, now);
        join(&mut session, bob, "Bob", None, now);
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        session.handle_message(alice, r#"{"type":"chat","message":"  hello  "}"#, now);
        session.handle_message(alice, r#"{"type":"chat","message":"   "}"#, now);

        for rx in [&mut alice_rx, &mut bob_rx] {
            assert_eq!(
                messages(rx),
                vec![ServerMessage::Chat {
                    from: "Alice".to_string(),
                    message: "hello".to_string(),
                }]
            );
        }
    }

    #[test]
    fn test_broadcast_survives_closed_connection() {
        let mut session = SessionManager::new(open_world());
        let now = Instant::now();
        let (alive, mut alive_rx) = connect(&mut session, 1);
        let (dead, dead_rx) = connect(&mut session, 2);
        join(&mut session, alive, "Alive", None, now);
        join(&mut session, dead, "Dead", None, now);
        drop(dead_rx);
        drain(&mut alive_rx);

        let summary = session.run_tick(now);

        assert_eq!(summary.recipients, 1);
        assert_eq!(last_snapshot(&mut alive_rx).len(), 2);
    }
}
