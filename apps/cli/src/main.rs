mod commands;
mod config;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{ClientEvent, GameClient};
use commands::CliCommand;
use config::{load_settings, normalize_server_url, parse_mode, Settings};
use futures::StreamExt;
use shared::domain::GameMode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream, LinesStream};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chess-cli", about = "Terminal client for the chess game server")]
struct Args {
    /// Game server base url, e.g. http://127.0.0.1:5000
    #[arg(long)]
    server_url: Option<String>,
    /// bot or pvp
    #[arg(long, value_parser = parse_mode_arg)]
    mode: Option<GameMode>,
    #[arg(long)]
    difficulty: Option<u8>,
    #[arg(long)]
    log_filter: Option<String>,
}

fn parse_mode_arg(raw: &str) -> Result<GameMode, String> {
    parse_mode(raw).ok_or_else(|| format!("unknown mode '{raw}', expected bot or pvp"))
}

impl Args {
    fn apply(self, settings: &mut Settings) {
        if let Some(v) = self.server_url {
            settings.server_url = v;
        }
        if let Some(v) = self.mode {
            settings.mode = v;
        }
        if let Some(v) = self.difficulty {
            settings.difficulty = v;
        }
        if let Some(v) = self.log_filter {
            settings.log_filter = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut settings = load_settings();
    Args::parse().apply(&mut settings);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let server_url = normalize_server_url(&settings.server_url)?;
    info!(%server_url, mode = ?settings.mode, difficulty = settings.difficulty, "starting chess client");
    let client = GameClient::new(&server_url).context("failed to set up game client")?;

    let mut events = BroadcastStream::new(client.subscribe_events());
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    client.start_game(settings.mode, settings.difficulty)?;
    println!("{}", commands::HELP);

    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(line) = line else {
                    break;
                };
                let line = line.context("failed to read stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                match commands::parse(&line) {
                    Ok(CliCommand::Quit) => break,
                    Ok(command) => run_command(&client, command, &settings).await?,
                    Err(err) => println!("{err}"),
                }
            }
            event = events.next() => match event {
                Some(Ok(event)) => print_event(&event),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!(skipped, "dropped client events");
                }
                None => break,
            },
        }
    }

    client.shutdown().await;
    Ok(())
}

async fn run_command(client: &GameClient, command: CliCommand, settings: &Settings) -> Result<()> {
    match command {
        CliCommand::Click(square) => client.click(square)?,
        CliCommand::Select(square) => client.select_square(square)?,
        CliCommand::Move(square) => client.attempt_move(square)?,
        CliCommand::Undo => client.undo()?,
        CliCommand::Resign { confirmed } => client.resign(confirmed)?,
        CliCommand::New { mode, difficulty } => client.start_game(
            mode.unwrap_or(settings.mode),
            difficulty.unwrap_or(settings.difficulty),
        )?,
        CliCommand::Refresh => client.refresh()?,
        CliCommand::State => {
            let view = client.view().await?;
            print!("{}", render::view(&view, chrono::Utc::now()));
        }
        CliCommand::Help => println!("{}", commands::HELP),
        CliCommand::Quit => {}
    }
    Ok(())
}

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::SessionStarted {
            session_id,
            mode,
            local_color,
        } => {
            let opponent = match mode {
                GameMode::VsBot => "the bot",
                GameMode::VsHuman => "a human",
            };
            println!("game {session_id}: you play {local_color} against {opponent}");
        }
        ClientEvent::BoardUpdated { board, last_move } => {
            let marks = render::Highlights {
                last_move: *last_move,
                ..Default::default()
            };
            print!("{}", render::board(board, &marks));
        }
        ClientEvent::SelectionChanged {
            selected: Some(square),
            valid_moves,
        } => {
            let moves: Vec<String> = valid_moves.iter().map(ToString::to_string).collect();
            println!("selected {square}: {}", moves.join(" "));
        }
        ClientEvent::CapturedUpdated(captured) if !captured.is_empty() => {
            println!("{}", render::captured(captured));
        }
        ClientEvent::MoveLogged {
            ply,
            mover,
            notation,
            quality,
        } => println!("{ply}. {mover} {notation} ({quality:?})"),
        ClientEvent::MoveLogTruncated { removed, remaining } => {
            println!("took back {removed} ply, {remaining} left in the log");
        }
        ClientEvent::Status(message) => println!("> {message}"),
        ClientEvent::ResignConfirmationRequired => {
            println!("Are you sure you want to resign? Type 'resign yes' to confirm.");
        }
        ClientEvent::GameOver { outcome, summary } => {
            println!("{}", outcome.headline());
            println!("{}", render::summary(summary));
        }
        ClientEvent::Error(err) => println!("error: {}", err.message()),
        ClientEvent::SelectionChanged { .. }
        | ClientEvent::CapturedUpdated(_)
        | ClientEvent::PhaseChanged { .. }
        | ClientEvent::UndoAvailability(_) => {}
    }
}
