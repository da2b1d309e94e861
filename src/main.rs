//! Axiomwire - Axioms game client protocol tool
//!
//! Connects to a game server, or encodes and decodes single frames.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use axiomwire::config::{self, Config};
use axiomwire::network::{Connection, ConnectionEvent, Dispatcher};
use axiomwire::protocol::{self, Message, MessageType, AXIOMS_PER_ROUND};

/// Axiomwire - Axioms game protocol client
#[derive(Parser)]
#[command(name = "axiomwire")]
#[command(author = "Axiomwire Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Talk to an Axioms game server over its binary WebSocket protocol", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a game server and print inbound messages
    Connect {
        /// Server endpoint (overrides config)
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Sub-protocol to negotiate (overrides config)
        #[arg(short, long)]
        subprotocol: Option<String>,

        /// Send a ready status once connected
        #[arg(long)]
        ready: Option<bool>,
    },

    /// Encode a message and print the frame as hex
    Encode {
        #[command(subcommand)]
        message: MessageArg,
    },

    /// Decode a hex frame, e.g. `decode 00 01 01`
    Decode {
        /// Frame bytes in hex, whitespace separated or contiguous
        #[arg(required = true)]
        bytes: Vec<String>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MessageArg {
    /// ReadyStatusChanged
    Ready {
        #[arg(action = ArgAction::Set)]
        ready: bool,
    },
    /// GameInit
    GameInit,
    /// RoundInit with the six axioms on offer
    RoundInit {
        #[arg(num_args = AXIOMS_PER_ROUND, required = true)]
        axioms: Vec<u8>,
    },
    /// PlayerTurnStart
    PlayerTurnStart,
    /// SelectionMade
    Selection { axiom: u8 },
    /// EvaluateSelections
    Evaluate,
}

impl MessageArg {
    fn into_message(self) -> anyhow::Result<Message> {
        let message = match self {
            MessageArg::Ready { ready } => Message::ReadyStatusChanged { ready },
            MessageArg::GameInit => Message::GameInit,
            MessageArg::RoundInit { axioms } => {
                let count = axioms.len();
                Message::RoundInit {
                    available_axioms: axioms.try_into().map_err(|_| {
                        anyhow::anyhow!("expected {} axioms, got {}", AXIOMS_PER_ROUND, count)
                    })?,
                }
            }
            MessageArg::PlayerTurnStart => Message::PlayerTurnStart,
            MessageArg::Selection { axiom } => Message::SelectionMade { selection: axiom },
            MessageArg::Evaluate => Message::EvaluateSelections,
        };
        Ok(message)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    // Initialize logging
    let filter = if cli.verbose || config.general.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Connect {
            endpoint,
            subprotocol,
            ready,
        } => {
            run_connect(config, endpoint, subprotocol, ready).await?;
        }
        Commands::Encode { message } => {
            let frame = protocol::encode(&message.into_message()?)?;
            println!("{}", to_hex(&frame));
        }
        Commands::Decode { bytes } => {
            let frame = parse_hex(&bytes)?;
            match protocol::decode(&frame) {
                Ok(message) => println!("{:?}", message),
                Err(e) => anyhow::bail!("Invalid frame: {}", e),
            }
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config()?;
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Connect and print traffic until the server closes or Ctrl+C
async fn run_connect(
    config: Config,
    endpoint: Option<String>,
    subprotocol: Option<String>,
    ready: Option<bool>,
) -> anyhow::Result<()> {
    let mut net_config = config.network();
    if let Some(endpoint) = endpoint {
        net_config.endpoint = endpoint;
    }
    if let Some(subprotocol) = subprotocol {
        net_config.subprotocol = subprotocol;
    }

    let mut dispatcher = Dispatcher::new();
    // ReadyStatusChanged is client-originated; anything else the server sends is printed
    for message_type in MessageType::ALL {
        if message_type != MessageType::ReadyStatusChanged {
            dispatcher.on(message_type, |message| println!("< {:?}", message));
        }
    }
    let mut event_rx = dispatcher
        .take_event_receiver()
        .context("event receiver already taken")?;

    let connector = net_config.ws_connector();
    let mut connection = Connection::open(net_config, connector, dispatcher);
    println!("Connecting to {}...", connection.endpoint());

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    ConnectionEvent::Opened { endpoint, subprotocol } => {
                        println!("Connected to {} ({})", endpoint, subprotocol);
                        if let Some(ready) = ready {
                            let message = Message::ReadyStatusChanged { ready };
                            connection.send(&message)?;
                            println!("> {:?}", message);
                        }
                    }
                    ConnectionEvent::DecodeFailed { error, frame_len } => {
                        tracing::warn!("Dropped frame ({} bytes): {}", frame_len, error);
                    }
                    ConnectionEvent::Unhandled { message } => {
                        tracing::info!("Unhandled message: {:?}", message);
                    }
                    ConnectionEvent::Closed { reason } => {
                        println!("Disconnected: {}", reason);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }
    }

    connection.close().await;
    tracing::info!("Client disconnected");

    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex digits, ignoring whitespace and an optional `0x`/`0X` per token
fn parse_hex(args: &[String]) -> anyhow::Result<Vec<u8>> {
    let digits: String = args
        .iter()
        .flat_map(|a| a.split_whitespace())
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if !digits.is_ascii() {
        anyhow::bail!("not hex: {}", digits);
    }
    if digits.len() % 2 != 0 {
        anyhow::bail!("odd number of hex digits: {}", digits);
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .with_context(|| format!("invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["axiomwire", "decode", "00", "01", "01"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["axiomwire", "connect", "--ready", "true"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_round_init_needs_six_axioms() {
        let cli = Cli::try_parse_from(["axiomwire", "encode", "round-init", "1", "2", "3"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_encode_args() {
        let message = MessageArg::Ready { ready: true }.into_message().unwrap();
        assert_eq!(to_hex(&protocol::encode(&message).unwrap()), "00 01 01");
    }

    #[test]
    fn test_parse_hex() {
        let bytes = parse_hex(&["00 01".to_string(), "0x01".to_string()]).unwrap();
        assert_eq!(bytes, vec![0x00, 0x01, 0x01]);
        assert_eq!(parse_hex(&["000101".to_string()]).unwrap(), vec![0, 1, 1]);
        assert_eq!(parse_hex(&["0x00 0x01".to_string()]).unwrap(), vec![0x00, 0x01]);
        assert_eq!(parse_hex(&["0X0a".to_string(), "0XFF".to_string()]).unwrap(), vec![0x0a, 0xff]);
        assert!(parse_hex(&["0".to_string()]).is_err());
        assert!(parse_hex(&["zz".to_string()]).is_err());
    }
}
