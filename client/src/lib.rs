//! # Game Client Library
//!
//! A headless bot client for the movement game server. It connects over
//! WebSocket, joins, keeps its identity token, drives its player from a
//! scripted or random input source and follows the server's close codes to
//! decide whether and how to reconnect.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client's view of the world:
//! - Latest snapshot of every player
//! - Own identity once welcomed
//! - Local movement for the position model, stepped with the shared
//!   `MovementRules` the server uses, or with a `PlatformerBody` when
//!   running the platformer variant
//!
//! ### Input Module (`input`)
//! Where directions come from:
//! - Scripts of `u d l r s` steps, cycled forever
//! - A random walk that holds each direction for a few steps
//! - Change detection with a periodic keep-alive so the server does not
//!   evict an idle bot
//!
//! ### Session Module (`session`)
//! Connection lifecycle:
//! - `ConnectionStatus` with explicit, checked transitions
//! - Reconnect decisions from close codes: 4000 stops, 4001 rejoins fresh,
//!   anything else resumes with the stored identity
//! - Bounded fixed back-off
//!
//! ### Network Module (`network`)
//! The run loop tying it together over `tokio-tungstenite`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::{InputManager, InputSource};
//! use client::network::{Client, ClientConfig, MovementMode};
//! use shared::MovementRules;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         server_url: "ws://127.0.0.1:3001".to_string(),
//!         name: "Bot".to_string(),
//!         movement: MovementMode::Velocity,
//!         rules: MovementRules::default(),
//!         step_interval: Duration::from_millis(250),
//!         max_reconnects: 5,
//!         reconnect_backoff: Duration::from_secs(1),
//!     };
//!
//!     let input = InputManager::new(InputSource::random_walk());
//!     let mut client = Client::new(config, input);
//!     client.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod session;
