//! Line-oriented command console on stdin.

use std::io::{self, BufRead, Write};

use crate::audio::{AudioPlayer, PlaybackState, RepeatMode, Transport};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsoleCmd {
    /// Select a track by its 1-based position in the listing.
    Play(usize),
    PlayPause,
    Next,
    Prev,
    Repeat,
    Stop,
    Status,
    List,
    Help,
    Quit,
}

const HELP: &str = "commands: play N | pause | next | prev | repeat | stop | status | list | quit";

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCmd>, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let cmd = match (word.to_ascii_lowercase().as_str(), arg) {
        ("play" | "select", Some(n)) => {
            let n: usize = n.parse().map_err(|_| format!("not a track number: {n}"))?;
            if n == 0 {
                return Err("track numbers start at 1".to_string());
            }
            ConsoleCmd::Play(n)
        }
        ("play" | "pause" | "toggle" | "p", None) => ConsoleCmd::PlayPause,
        ("next" | "n", None) => ConsoleCmd::Next,
        ("prev" | "previous", None) => ConsoleCmd::Prev,
        ("repeat" | "r", None) => ConsoleCmd::Repeat,
        ("stop", None) => ConsoleCmd::Stop,
        ("status" | "s", None) => ConsoleCmd::Status,
        ("list" | "ls", None) => ConsoleCmd::List,
        ("help" | "?", None) => ConsoleCmd::Help,
        ("quit" | "exit" | "q", None) => ConsoleCmd::Quit,
        _ => return Err(format!("unknown command: {}", line.trim())),
    };
    Ok(Some(cmd))
}

pub fn format_status(state: &PlaybackState, names: &[String]) -> String {
    let transport = match state.transport {
        Transport::Playing => "playing",
        Transport::Paused => "paused",
        Transport::Stopped => "stopped",
    };
    let repeat = match state.repeat {
        RepeatMode::Off => "off",
        RepeatMode::Track => "track",
    };
    let name = names
        .get(state.current_index)
        .map(String::as_str)
        .unwrap_or("?");

    let mut line = format!(
        "[{transport}] {}/{} {name}  {:>3.0}%  amp {:.2}  repeat {repeat}",
        state.current_index + 1,
        names.len(),
        state.progress * 100.0,
        state.amplitude,
    );
    if let Some(err) = &state.last_error {
        line.push_str(&format!("  error: {err}"));
    }
    line
}

/// Read commands until `quit` or end of input.
pub fn run<R, W>(input: R, mut out: W, player: &AudioPlayer, names: &[String]) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "{HELP}")?;
    for line in input.lines() {
        let line = line?;
        let cmd = match parse_line(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(msg) => {
                writeln!(out, "{msg}")?;
                continue;
            }
        };

        match cmd {
            ConsoleCmd::Play(n) => player.select_song(n - 1),
            ConsoleCmd::PlayPause => player.play_pause(),
            ConsoleCmd::Next => player.next(),
            ConsoleCmd::Prev => player.previous(),
            ConsoleCmd::Repeat => player.toggle_repeat(),
            ConsoleCmd::Stop => player.stop(),
            ConsoleCmd::Status => writeln!(out, "{}", format_status(&player.snapshot(), names))?,
            ConsoleCmd::List => {
                for (i, name) in names.iter().enumerate() {
                    writeln!(out, "{:>3}. {name}", i + 1)?;
                }
            }
            ConsoleCmd::Help => writeln!(out, "{HELP}")?,
            ConsoleCmd::Quit => break,
        }
    }
    Ok(())
}
