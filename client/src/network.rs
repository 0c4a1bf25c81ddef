use crate::game::ClientGameState;
use crate::input::InputManager;
use crate::session::{ConnectionState, ConnectionStatus, ReconnectDecision, ReconnectPolicy};
use clap::ValueEnum;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{
    default_obstacles, ClientMessage, MovementRules, ServerMessage, POSITION_SEND_INTERVAL_MS,
};
use std::time::{Duration, Instant};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Log a snapshot summary every this many snapshots.
const SNAPSHOT_LOG_INTERVAL: u64 = 40;

/// Which message the bot drives its player with. Must match the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MovementMode {
    #[default]
    Velocity,
    Position,
    /// Position reports from a local gravity and jump simulation.
    Platformer,
}

impl MovementMode {
    pub fn reports_positions(self) -> bool {
        matches!(self, MovementMode::Position | MovementMode::Platformer)
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub name: String,
    pub movement: MovementMode,
    /// Speed, radius and bounds for local steps; must match the server.
    pub rules: MovementRules,
    /// How often the input source is stepped.
    pub step_interval: Duration,
    pub max_reconnects: u32,
    pub reconnect_backoff: Duration,
}

/// How one connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEnd {
    pub close_code: Option<u16>,
}

pub struct Client {
    config: ClientConfig,
    state: ConnectionState,
    identity: Option<String>,
    game: ClientGameState,
    input: InputManager,
    policy: ReconnectPolicy,
}

impl Client {
    pub fn new(config: ClientConfig, input: InputManager) -> Self {
        let policy = ReconnectPolicy::new(config.max_reconnects, config.reconnect_backoff);
        let game = ClientGameState::with_rules(config.rules, default_obstacles());
        Self {
            config,
            state: ConnectionState::new(),
            identity: None,
            game,
            input,
            policy,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    /// The stored identity token from the last welcome.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn game(&self) -> &ClientGameState {
        &self.game
    }

    /// Connects, plays, and reconnects according to the close code until
    /// told to stop or out of attempts.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let decision = match self.connect_once().await {
                Ok(end) => {
                    info!("Connection closed (code {:?})", end.close_code);
                    ReconnectDecision::from_close_code(end.close_code)
                }
                Err(e) => {
                    error!("Connection error: {}", e);
                    self.state.transition(ConnectionStatus::Error);
                    ReconnectDecision::Resume
                }
            };
            self.game.reset();
            self.input.reset();

            match decision {
                ReconnectDecision::Stop => {
                    info!("Replaced by another connection, not reconnecting");
                    return Ok(());
                }
                ReconnectDecision::Fresh => {
                    info!("Evicted for inactivity, rejoining as a new player");
                    self.identity = None;
                }
                ReconnectDecision::Resume => {}
            }

            match self.policy.next_delay() {
                Some(delay) => {
                    info!(
                        "Reconnecting in {:?} (attempt {})",
                        delay,
                        self.policy.attempts()
                    );
                    sleep(delay).await;
                }
                None => {
                    warn!("Giving up after {} attempts", self.policy.attempts());
                    return Ok(());
                }
            }
        }
    }

    /// Runs a single connection from handshake to close.
    pub async fn connect_once(&mut self) -> Result<SessionEnd, Box<dyn std::error::Error>> {
        self.state.transition(ConnectionStatus::Connecting);
        info!("Connecting to {}", self.config.server_url);
        let (ws_stream, _) = connect_async(self.config.server_url.as_str()).await?;
        self.state.transition(ConnectionStatus::Open);

        let (mut sink, mut stream) = ws_stream.split();

        let join = ClientMessage::join(&self.config.name, self.identity.as_deref());
        sink.send(Message::Text(join.encode()?)).await?;

        let mut input_interval = interval(self.config.step_interval);
        let mut position_interval = interval(Duration::from_millis(POSITION_SEND_INTERVAL_MS));
        position_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let position_mode = self.config.movement.reports_positions();
        let platformer = self.config.movement == MovementMode::Platformer;

        loop {
            tokio::select! {
                message = stream.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => self.handle_text(&text),
                        Some(Ok(Message::Close(frame))) => {
                            self.state.transition(ConnectionStatus::Closed);
                            let close_code = frame.map(|f| u16::from(f.code));
                            return Ok(SessionEnd { close_code });
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            self.state.transition(ConnectionStatus::Closed);
                            return Ok(SessionEnd { close_code: None });
                        }
                    }
                },

                _ = input_interval.tick() => {
                    // Nothing is sent before the welcome, so make sure the
                    // first direction after it goes out.
                    if self.game.my_id.is_none() {
                        self.input.reset();
                    }
                    let changed = self.input.update(Instant::now());
                    let joined = self.game.my_id.is_some();
                    if let (Some(direction), false, true) = (changed, position_mode, joined) {
                        debug!("Sending input {}", direction.as_str());
                        sink.send(Message::Text(ClientMessage::input(direction).encode()?)).await?;
                    }
                },

                _ = position_interval.tick(), if position_mode => {
                    let dt = POSITION_SEND_INTERVAL_MS as f32 / 1000.0;
                    let direction = self.input.current();
                    let stepped = if platformer {
                        self.game.step_platformer(direction, dt)
                    } else {
                        self.game.step_local(direction, dt)
                    };
                    if let Some(position) = stepped {
                        sink.send(Message::Text(ClientMessage::position(position).encode()?)).await?;
                    }
                },
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        let message = match ServerMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Ignoring unexpected frame: {}", e);
                return;
            }
        };

        match message {
            ServerMessage::Welcome { my_id, player } => {
                info!(
                    "Joined as {} ({}) at ({:.1}, {:.1})",
                    my_id, player.name, player.x, player.y
                );
                self.identity = Some(my_id.clone());
                self.game.handle_welcome(my_id, player);
                self.policy.reset();
            }
            ServerMessage::GameState { players } => {
                self.game.apply_snapshot(players);
                if self.game.snapshots_received % SNAPSHOT_LOG_INTERVAL == 1 {
                    match self.game.me() {
                        Some(me) => info!(
                            "{} players online, me at ({:.1}, {:.1})",
                            self.game.players.len(),
                            me.x,
                            me.y
                        ),
                        None => info!("{} players online", self.game.players.len()),
                    }
                }
            }
            ServerMessage::Chat { from, message } => {
                info!("[chat] {}: {}", from, message);
            }
        }
    }
}
