use clap::Parser;
use client::input::{parse_script, InputManager, InputSource};
use client::network::{Client, ClientConfig, MovementMode};
use shared::MovementRules;
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, env = "SERVER_URL", default_value = "ws://127.0.0.1:3001")]
    server: String,

    /// Display name to join with
    #[arg(short = 'n', long, default_value = "Bot")]
    name: String,

    /// Direction steps to cycle through, e.g. "rrrddlls" (random walk if omitted)
    #[arg(long)]
    script: Option<String>,

    /// Movement model; must match the server
    #[arg(short = 'm', long, value_enum, default_value_t = MovementMode::Velocity)]
    movement: MovementMode,

    /// Player speed for local steps; must match the server
    #[arg(long, env = "PLAYER_SPEED", default_value_t = shared::PLAYER_SPEED)]
    speed: f32,

    /// Player radius for local steps; must match the server
    #[arg(long, env = "PLAYER_RADIUS", default_value_t = shared::PLAYER_RADIUS)]
    radius: f32,

    /// Milliseconds between input steps
    #[arg(long, default_value = "250")]
    step_ms: u64,

    /// Reconnect attempts before giving up
    #[arg(long, default_value = "5")]
    max_reconnects: u32,

    /// Milliseconds to wait before each reconnect
    #[arg(long, default_value = "1000")]
    backoff_ms: u64,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let source = match &args.script {
        Some(script) => InputSource::script(parse_script(script)?),
        None => InputSource::random_walk(),
    };

    let duration = args.duration;

    info!("Starting client...");
    info!("Connecting to: {} as {}", args.server, args.name);

    let config = ClientConfig {
        server_url: args.server,
        name: args.name,
        movement: args.movement,
        rules: MovementRules {
            player_speed: args.speed,
            player_radius: args.radius,
            ..MovementRules::default()
        },
        step_interval: Duration::from_millis(args.step_ms.max(1)),
        max_reconnects: args.max_reconnects,
        reconnect_backoff: Duration::from_millis(args.backoff_ms),
    };
    let mut client = Client::new(config, InputManager::new(source));

    let run_for = async move {
        match duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        result = client.run() => result?,
        _ = run_for => info!("Run time elapsed"),
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    Ok(())
}
