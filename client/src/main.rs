use clap::{Parser, Subcommand};
use client::game::next_step;
use client::network::{MazeClient, Transport};
use log::{info, warn};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:55556")]
    server: String,

    /// Use the HTTP API instead of the line protocol
    #[arg(long)]
    http: bool,

    /// Seconds to wait for each reply
    #[arg(short = 't', long, default_value = "5")]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Measure the round-trip time of one request
    Ping,
    /// Register a player
    Join { id: String, name: Vec<String> },
    /// Print a player's base64 avatar
    Face { id: String },
    /// List player ids in join order
    Players,
    /// Move a player to a pixel position
    Move { id: String, x: i64, y: i64 },
    /// Print a player's position
    Where { id: String },
    /// Dump the full game state as JSON
    State,
    /// Start a new round
    Reset,
    /// Join and walk the shortest route to the exit
    Solve {
        id: String,
        #[arg(long, default_value = "Solver")]
        name: String,
        #[arg(long, default_value = "500")]
        max_steps: u32,
        /// Pause between moves in milliseconds
        #[arg(long, default_value = "50")]
        delay_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let transport = if args.http {
        Transport::Http
    } else {
        Transport::Line
    };
    let client = MazeClient::new(&args.server, transport, Duration::from_secs(args.timeout_secs));
    info!("Using {:?} transport against {}", transport, args.server);

    match args.command {
        Action::Ping => {
            let rtt = client.ping().await?;
            println!("{} answered in {:.2}ms", args.server, rtt.as_secs_f64() * 1000.0);
        }
        Action::Join { id, name } => {
            let name = if name.is_empty() {
                None
            } else {
                Some(name.join(" "))
            };
            client.add_player(&id, name.as_deref()).await?;
            println!("Player {} added", id);
        }
        Action::Face { id } => println!("{}", client.get_players_face(&id).await?),
        Action::Players => {
            for id in client.get_all_players().await? {
                println!("{}", id);
            }
        }
        Action::Move { id, x, y } => {
            client.set_location(&id, x, y).await?;
            println!("Player {} moved to {},{}", id, x, y);
        }
        Action::Where { id } => {
            let position = client.get_location(&id).await?;
            println!("{},{}", position.x, position.y);
        }
        Action::State => {
            let snapshot = client.get_game_state().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Action::Reset => {
            client.reset_game().await?;
            println!("Game reset");
        }
        Action::Solve {
            id,
            name,
            max_steps,
            delay_ms,
        } => solve(&client, &id, &name, max_steps, Duration::from_millis(delay_ms)).await?,
    }

    Ok(())
}

/// Follows the shortest route one cell per request until someone wins
async fn solve(
    client: &MazeClient,
    id: &str,
    name: &str,
    max_steps: u32,
    delay: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    client.add_player(id, Some(name)).await?;

    for step in 0..max_steps {
        let snapshot = client.get_game_state().await?;
        if let Some(winner) = &snapshot.winner {
            let score = snapshot
                .player_stats
                .get(id)
                .map(|stats| stats.score)
                .unwrap_or_default();
            println!(
                "Round {} won by {} after {} steps (score {})",
                snapshot.round_number, winner, step, score
            );
            return Ok(());
        }

        let Some(target) = next_step(&snapshot, id) else {
            warn!("No route from the current position of {}", id);
            return Ok(());
        };
        client.set_location(id, target.x, target.y).await?;
        tokio::time::sleep(delay).await;
    }

    println!("Gave up after {} steps", max_steps);
    Ok(())
}
