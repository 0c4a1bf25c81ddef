//! # Game Server Library
//!
//! Authoritative server for a top-down multiplayer movement game. It owns the
//! canonical player state, resolves collisions against a static map, and
//! broadcasts full snapshots to every connected client at a fixed rate.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only send intents: a direction (velocity model) or a locally
//! simulated position (position model). The server integrates, clamps to the
//! world bounds and pushes players out of obstacles. What it broadcasts is
//! the truth.
//!
//! ### Identity Management
//! A player id outlives the connection that created it. A client may rejoin
//! with its stored id to resume the same player; if another connection still
//! owns that id, the older connection is closed with code 4000. Players that
//! send nothing for the inactivity timeout are evicted and their connection
//! is closed with code 4001.
//!
//! ### State Broadcasting
//! Every tick (or only on change, depending on configuration) the full player
//! list is encoded once and queued to every live connection.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Event Loop
//! One task owns the [`session::SessionManager`] and with it the whole world.
//! Connection tasks never touch game state; they forward [`network::ServerEvent`]s
//! over a channel. The owning task interleaves those events with ticks, so
//! no handler ever runs concurrently with another or with the tick.
//!
//! ### WebSocket Transport
//! JSON text frames over WebSocket. Each connection gets a writer task fed by
//! an unbounded queue, so a slow client can never stall a broadcast.
//!
//! ## Module Organization
//!
//! - `config`: startup settings and their validation
//! - `connection`: connection ids and the outbound queue handle
//! - `game`: world model and the simulation tick
//! - `session`: join, reconnect, replacement and disconnect handling
//! - `network`: listener, per-connection tasks and the main loop
//! - `utils`: id minting and input sanitising
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:3001".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod game;
pub mod network;
pub mod session;
pub mod utils;
