//! Headless billiards client.
//!
//! Usage: cargo run --bin billiards-client -- [OPTIONS]
//!
//! Options:
//!   --server ADDR    Server address (default: 127.0.0.1:9001)
//!   --room ID        Join an existing room instead of creating one
//!   --auth-file F    Credential store (default: billiards-auth.json)
//!   --id ID          Player identity (overrides the stored one)
//!   --secret S       Seat secret (overrides the stored one)
//!   --seed N         Deterministic autopilot and rack
//!   --offline        Play a solo practice game locally
//!   --shots N        Offline shot budget (default: 200)

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use billiards_client::auth::ClientAuth;
use billiards_client::{connection, offline};

struct Options {
    server: String,
    room: Option<String>,
    auth_file: String,
    id: Option<String>,
    secret: Option<String>,
    seed: Option<u64>,
    offline: bool,
    shots: u32,
}

fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = Options {
        server: "127.0.0.1:9001".to_string(),
        room: None,
        auth_file: "billiards-auth.json".to_string(),
        id: None,
        secret: None,
        seed: None,
        offline: false,
        shots: 200,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" => {
                i += 1;
                opts.server = args.get(i).cloned().unwrap_or(opts.server);
            }
            "--room" => {
                i += 1;
                opts.room = args.get(i).cloned();
            }
            "--auth-file" => {
                i += 1;
                opts.auth_file = args.get(i).cloned().unwrap_or(opts.auth_file);
            }
            "--id" => {
                i += 1;
                opts.id = args.get(i).cloned();
            }
            "--secret" => {
                i += 1;
                opts.secret = args.get(i).cloned();
            }
            "--seed" => {
                i += 1;
                opts.seed = args.get(i).and_then(|s| s.parse().ok());
            }
            "--shots" => {
                i += 1;
                opts.shots = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(200);
            }
            "--offline" => opts.offline = true,
            _ => {}
        }
        i += 1;
    }
    opts
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let opts = parse_args();

    if opts.offline {
        let report = offline::play_offline(opts.seed, opts.shots);
        println!(
            "Practice over: {} shots, {} balls pocketed{}",
            report.shots,
            report.pocketed,
            if report.finished { ", eight ball down" } else { "" }
        );
        return;
    }

    let mut rng = match opts.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut auth = ClientAuth::load_or_generate(std::path::Path::new(&opts.auth_file), &mut rng);
    if let Some(id) = opts.id {
        auth.id = id;
    }
    if let Some(secret) = opts.secret {
        auth.secret = secret;
    }

    let room = match opts.room {
        Some(room) => room,
        None => match connection::create_room(&opts.server).await {
            Ok(room) => {
                println!("Room {} is ready, share the id to get an opponent", room);
                room
            }
            Err(e) => {
                eprintln!("Failed to create room: {}", e);
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = connection::play(&opts.server, &room, &auth, opts.seed).await {
        eprintln!("Session error: {}", e);
        std::process::exit(1);
    }
}
