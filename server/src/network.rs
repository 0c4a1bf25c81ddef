//! Server network layer: WebSocket transport and the main event loop

use crate::config::ServerConfig;
use crate::connection::{ConnectionHandle, ConnectionId, Outbound};
use crate::session::SessionManager;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// Consecutive over-budget ticks before a warning is logged.
const OVERRUN_WARN_THRESHOLD: u32 = 3;
const STATS_INTERVAL_TICKS: u64 = 100;
/// How long a peer gets to answer our close frame before the socket is
/// dropped.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Events sent from connection tasks to the main loop
#[derive(Debug)]
pub enum ServerEvent {
    Connected {
        handle: ConnectionHandle,
    },
    Frame {
        connection: ConnectionId,
        text: String,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

/// Tracks tick durations against the tick period.
#[derive(Debug)]
pub struct TickMonitor {
    budget: Duration,
    consecutive_overruns: u32,
    total_overruns: u64,
}

impl TickMonitor {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            consecutive_overruns: 0,
            total_overruns: 0,
        }
    }

    /// Records one tick. Returns true if this tick triggered a warning.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        if elapsed <= self.budget {
            self.consecutive_overruns = 0;
            return false;
        }

        self.consecutive_overruns += 1;
        self.total_overruns += 1;
        if self.consecutive_overruns % OVERRUN_WARN_THRESHOLD == 0 {
            warn!(
                "Tick took {:.2}ms, over the {:.2}ms budget for {} ticks in a row ({} total)",
                elapsed.as_secs_f64() * 1000.0,
                self.budget.as_secs_f64() * 1000.0,
                self.consecutive_overruns,
                self.total_overruns
            );
            return true;
        }
        false
    }

    pub fn total_overruns(&self) -> u64 {
        self.total_overruns
    }
}

/// Main server coordinating the transport and the simulation.
///
/// All session and world mutation happens on the task that runs [`Server::run`];
/// connection tasks only forward events to it.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    session: SessionManager,
    tick_period: Duration,

    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let listener = TcpListener::bind(&config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on ws://{}", local_addr);
        info!(
            "World {}x{}, {} Hz, {:?} movement, {:?} broadcast, {} obstacles",
            config.world_width,
            config.world_height,
            config.tick_rate,
            config.movement_model,
            config.broadcast_policy,
            config.obstacles.len()
        );

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let tick_period = config.tick_period();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            session: SessionManager::new(config),
            tick_period,
            event_tx,
            event_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected { handle } => {
                self.session.register_connection(handle);
            }
            ServerEvent::Frame { connection, text } => {
                self.session.handle_message(connection, &text, Instant::now());
            }
            ServerEvent::Disconnected { connection } => {
                self.session.handle_disconnect(connection);
            }
        }
    }

    /// Main server loop: interleaves connection events with fixed-rate ticks.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = self.listener.take().ok_or("server is already running")?;
        tokio::spawn(accept_loop(listener, self.event_tx.clone()));

        let mut tick_interval = interval(self.tick_period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut monitor = TickMonitor::new(self.tick_period);

        info!("Server started successfully");

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            info!("Event channel closed, shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let started = Instant::now();
                    let summary = self.session.run_tick(started);
                    let elapsed = started.elapsed();
                    monitor.record(elapsed);

                    if summary.report.tick % STATS_INTERVAL_TICKS == 0 {
                        let stats = self.session.stats();
                        if stats.connections > 0 {
                            debug!(
                                "Tick {}: {} players, {} connections ({} bound), {:.2}ms, {} overruns",
                                stats.tick,
                                stats.players,
                                stats.connections,
                                stats.bound,
                                elapsed.as_secs_f64() * 1000.0,
                                monitor.total_overruns()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, events: mpsc::UnboundedSender<ServerEvent>) {
    let mut next_id = 1u64;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if events.is_closed() {
                    break;
                }
                let connection = ConnectionId(next_id);
                next_id += 1;
                tokio::spawn(handle_connection(
                    stream,
                    addr,
                    connection,
                    events.clone(),
                    CLOSE_HANDSHAKE_TIMEOUT,
                ));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Runs one WebSocket connection: a writer task drains the outbound queue,
/// while this task forwards text frames until the peer goes away. Once the
/// writer has stopped, the peer has `close_timeout` to finish the close
/// handshake.
async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    connection: ConnectionId,
    events: mpsc::UnboundedSender<ServerEvent>,
    close_timeout: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = match accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut sink, mut source) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(connection, addr, tx);
    if events.send(ServerEvent::Connected { handle }).is_err() {
        return;
    }

    let (writer_done_tx, writer_done_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        debug!("Write to {} failed: {}", connection, e);
                        break;
                    }
                }
                Outbound::Close(reason) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(reason.code()),
                        reason: Cow::Borrowed(reason.reason()),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        debug!("Close of {} failed: {}", connection, e);
                    }
                    break;
                }
            }
        }
        let _ = writer_done_tx.send(());
    });

    let forward = async {
        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if events.send(ServerEvent::Frame { connection, text }).is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                // Binary frames are not part of the protocol; ping/pong is
                // answered by tungstenite.
                Ok(_) => {}
                Err(e) => {
                    debug!("Read from {} failed: {}", connection, e);
                    break;
                }
            }
        }
    };
    let close_deadline = async {
        let _ = writer_done_rx.await;
        sleep(close_timeout).await;
    };

    tokio::select! {
        _ = forward => {}
        _ = close_deadline => {
            debug!("{} did not finish the close handshake, dropping it", connection);
        }
    }

    if events.send(ServerEvent::Disconnected { connection }).is_err() {
        debug!("Main loop gone before {} disconnected", connection);
    }
}
