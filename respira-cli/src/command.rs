//! Line-oriented user commands read from stdin on a helper thread.

use std::io::BufRead;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, bail};
use respira_engine::ThemeKind;

pub const HELP: &str = "\
commands:
  start [pattern]   begin (or resume) a session
  pause | resume    freeze / continue
  reset             back to ready
  volume <0..1>     master volume
  theme <name>      ocean | forest | sunset | night
  mute | unmute     sound off / on
  status            print the current state
  patterns          list patterns
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(Option<String>),
    Pause,
    Resume,
    Reset,
    Volume(f32),
    Theme(ThemeKind),
    Mute,
    Unmute,
    Status,
    Patterns,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else { bail!("empty command") };
        let arg = words.next();
        let cmd = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("start" | "s", key) => Command::Start(key.map(str::to_string)),
            ("pause" | "p", None) => Command::Pause,
            ("resume" | "r", None) => Command::Resume,
            ("reset", None) => Command::Reset,
            ("volume" | "vol" | "v", Some(v)) => Command::Volume(
                v.parse().map_err(|_| anyhow!("not a number: {v}"))?,
            ),
            ("theme" | "t", Some(name)) => Command::Theme(name.parse()?),
            ("mute" | "m", None) => Command::Mute,
            ("unmute" | "u", None) => Command::Unmute,
            ("status", None) => Command::Status,
            ("patterns", None) => Command::Patterns,
            ("help" | "?", None) => Command::Help,
            ("quit" | "q" | "exit", None) => Command::Quit,
            (other, _) => bail!("unknown command or bad arguments: {other}"),
        };
        Ok(cmd)
    }
}

/// Forward parsed stdin lines until EOF or until the receiver hangs up.
pub fn spawn_reader(tx: Sender<Command>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("{e} (type `help`)"),
            }
        }
        log::debug!("stdin closed");
    })
}
