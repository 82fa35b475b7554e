use anyhow::{anyhow, bail, Result};
use shared::domain::{GameMode, Square};

use crate::config::parse_mode;

pub const HELP: &str = "\
commands:
  <square>            click a square, e.g. e2 then e4
  select <square>     select a piece
  move <square>       move the selected piece
  undo                take back the last move (both plies against the bot)
  resign [yes]        resign; asks for confirmation without 'yes'
  new [bot|pvp] [n]   start a new game, optional difficulty
  state               show the board, clock and move list
  refresh             re-fetch the board from the server
  help                show this text
  quit                leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Click(Square),
    Select(Square),
    Move(Square),
    Undo,
    Resign { confirmed: bool },
    New {
        mode: Option<GameMode>,
        difficulty: Option<u8>,
    },
    State,
    Refresh,
    Help,
    Quit,
}

fn square(raw: Option<&str>) -> Result<Square> {
    let raw = raw.ok_or_else(|| anyhow!("missing square, e.g. e2"))?;
    Square::from_algebraic(raw).ok_or_else(|| anyhow!("not a square: {raw}"))
}

pub fn parse(line: &str) -> Result<CliCommand> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        bail!("type 'help' for commands");
    };
    let command = match head.to_ascii_lowercase().as_str() {
        "select" | "s" => CliCommand::Select(square(words.next())?),
        "move" | "m" => CliCommand::Move(square(words.next())?),
        "undo" | "u" => CliCommand::Undo,
        "resign" => CliCommand::Resign {
            confirmed: matches!(words.next(), Some("yes" | "y")),
        },
        "new" | "n" => {
            let mut mode = None;
            let mut difficulty = None;
            for word in words.by_ref() {
                if let Ok(level) = word.parse::<u8>() {
                    difficulty = Some(level);
                } else {
                    mode = Some(parse_mode(word).ok_or_else(|| anyhow!("unknown mode: {word}"))?);
                }
            }
            CliCommand::New { mode, difficulty }
        }
        "state" | "board" => CliCommand::State,
        "refresh" | "r" => CliCommand::Refresh,
        "help" | "?" => CliCommand::Help,
        "quit" | "exit" | "q" => CliCommand::Quit,
        other => match Square::from_algebraic(other) {
            Some(sq) => CliCommand::Click(sq),
            None => bail!("unknown command '{other}', type 'help'"),
        },
    };
    if let Some(extra) = words.next() {
        bail!("unexpected argument '{extra}'");
    }
    Ok(command)
}
