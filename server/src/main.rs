use clap::Parser;
use log::info;
use server::config::{BroadcastPolicy, MovementModel, ServerConfig};
use server::network::Server;
use shared::default_obstacles;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, env = "TICK_RATE", default_value_t = shared::TICK_RATE)]
    tick_rate: u32,

    /// World width in world units
    #[arg(long, env = "WORLD_WIDTH", default_value_t = shared::WORLD_WIDTH)]
    world_width: f32,

    /// World height in world units
    #[arg(long, env = "WORLD_HEIGHT", default_value_t = shared::WORLD_HEIGHT)]
    world_height: f32,

    /// Player speed in world units per second
    #[arg(long, env = "PLAYER_SPEED", default_value_t = shared::PLAYER_SPEED)]
    speed: f32,

    /// Player collision radius
    #[arg(long, env = "PLAYER_RADIUS", default_value_t = shared::PLAYER_RADIUS)]
    radius: f32,

    /// Seconds without input before a player is evicted
    #[arg(
        long,
        env = "INACTIVITY_TIMEOUT",
        default_value_t = shared::INACTIVITY_TIMEOUT_SECS
    )]
    inactivity_timeout: u64,

    /// Which client message drives movement
    #[arg(long, env = "MOVEMENT_MODEL", value_enum, default_value_t = MovementModel::Velocity)]
    movement: MovementModel,

    /// When to broadcast snapshots
    #[arg(long, env = "BROADCAST_POLICY", value_enum, default_value_t = BroadcastPolicy::Always)]
    broadcast: BroadcastPolicy,

    /// Run on an empty map
    #[arg(long, env = "NO_OBSTACLES")]
    no_obstacles: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            tick_rate: self.tick_rate,
            world_width: self.world_width,
            world_height: self.world_height,
            player_speed: self.speed,
            player_radius: self.radius,
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout),
            movement_model: self.movement,
            broadcast_policy: self.broadcast,
            obstacles: if self.no_obstacles {
                Vec::new()
            } else {
                default_obstacles()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Starting server...");

    let mut server = Server::new(args.into_config()).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
