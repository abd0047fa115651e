//! Multi-room Chat Client
//!
//! Line-based terminal client: restores the saved username, prints
//! server lines, and shows the current room in the prompt.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use room_chat_server::client::{
    help_text, requested_username, LocalCommand, RoomTracker, UsernameStore,
    DEFAULT_USERNAME_FILE,
};
use room_chat_server::config::DEFAULT_ADDR;

#[derive(Parser, Debug)]
#[command(name = "room_chat_client", about = "Terminal client for the chat server", version)]
struct ClientArgs {
    /// Server address
    #[arg(long, env = "ROOM_CHAT_SERVER", default_value = DEFAULT_ADDR)]
    server: String,

    /// File the username is saved to between runs
    #[arg(long, env = "ROOM_CHAT_USERNAME_FILE", default_value = DEFAULT_USERNAME_FILE)]
    username_file: PathBuf,
}

type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = ClientArgs::parse();
    let store = UsernameStore::new(args.username_file);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let Some(username) = choose_username(&store, &mut input).await? else {
        return Ok(());
    };

    let stream = TcpStream::connect(&args.server).await?;
    let (reader, writer) = stream.into_split();
    let mut server_lines = FramedRead::new(reader, LinesCodec::new());
    let mut sink = FramedWrite::new(writer, LinesCodec::new());

    println!("Connected to chat server at {}", args.server);
    println!("Type /help to see commands");

    sink.send(format!("/username {}", username)).await?;

    // Print server lines and keep the room display current
    let (room_tx, room_rx) = watch::channel(RoomTracker::new());
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = server_lines.next().await {
            match frame {
                Ok(line) => {
                    println!("{}", line);
                    room_tx.send_modify(|tracker| tracker.observe(&line));
                }
                Err(e) => {
                    warn!("Server read error: {}", e);
                    break;
                }
            }
        }
        debug!("Server closed the connection");
    });

    loop {
        print!("{}", room_rx.borrow().prompt());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = input.next_line() => line?,
            _ = &mut read_task => {
                println!("Disconnected from server");
                return Ok(());
            }
        };
        let Some(line) = line else {
            break;
        };

        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        match LocalCommand::parse(text) {
            Some(LocalCommand::Help) => {
                println!("{}", help_text());
                continue;
            }
            Some(LocalCommand::CurrentRoom) => {
                match room_rx.borrow().current() {
                    Some(room) => println!("Currently in room: {}", room),
                    None => println!("Not in any room (lobby)"),
                }
                continue;
            }
            Some(LocalCommand::Quit) => {
                println!("Goodbye!");
                break;
            }
            None => {}
        }

        if let Some(name) = requested_username(text) {
            if let Err(e) = store.save(name).await {
                warn!("Failed to save username to {}: {}", store.path().display(), e);
            }
        }

        sink.send(text.to_string()).await?;
    }

    let _ = SinkExt::<String>::close(&mut sink).await;
    Ok(())
}

/// Reuse the saved username or ask for one, saving the choice
async fn choose_username(
    store: &UsernameStore,
    input: &mut StdinLines,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    if let Some(saved) = store.load().await? {
        println!("Welcome back! Your username is: {}", saved);
        print!("Press Enter to use it, or type a new username: ");
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        let typed = line.trim();
        if typed.is_empty() {
            return Ok(Some(saved));
        }
        store.save(typed).await?;
        return Ok(Some(typed.to_string()));
    }

    print!("Enter your username: ");
    std::io::stdout().flush()?;
    while let Some(line) = input.next_line().await? {
        let typed = line.trim();
        if !typed.is_empty() {
            store.save(typed).await?;
            return Ok(Some(typed.to_string()));
        }
        print!("Username cannot be empty. Please try again: ");
        std::io::stdout().flush()?;
    }
    Ok(None)
}
