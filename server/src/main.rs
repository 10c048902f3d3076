use clap::Parser;
use log::{error, info};
use server::config::{GameConfig, ProtocolMode, ServerConfig};
use server::game::GameState;
use server::network::Server;
use shared::{CELL_SIZE, MAZE_HEIGHT, MAZE_WIDTH};
use std::path::PathBuf;
use std::time::Duration;

/// Multiplayer maze game server
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value = "55556")]
    port: u16,
    /// Request framing accepted on the port
    #[clap(long, value_enum, default_value = "auto")]
    protocol: ProtocolMode,
    /// Seconds to wait for a complete request before dropping a connection
    #[clap(long, default_value = "10")]
    read_timeout_secs: u64,
    #[clap(long, default_value_t = MAZE_WIDTH)]
    maze_width: usize,
    #[clap(long, default_value_t = MAZE_HEIGHT)]
    maze_height: usize,
    /// Pixel size of one maze cell
    #[clap(long, default_value_t = CELL_SIZE)]
    cell_size: i64,
    /// Seed for reproducible mazes
    #[clap(long)]
    seed: Option<u64>,
    /// Directory served for non-API GET requests
    #[clap(long, default_value = ".")]
    static_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let game_config = GameConfig {
        maze_width: args.maze_width,
        maze_height: args.maze_height,
        cell_size: args.cell_size,
        seed: args.seed,
    };
    let server_config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        protocol: args.protocol,
        read_timeout: Duration::from_secs(args.read_timeout_secs),
        static_dir: args.static_dir,
        ..ServerConfig::default()
    };

    let game = GameState::shared(game_config);
    {
        let state = game.read().await;
        info!(
            "Generated {}x{} maze with {} collectibles",
            state.maze().width(),
            state.maze().height(),
            state.collectibles().len()
        );
    }

    let server = Server::bind(server_config, game).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
