//! Line-oriented control console
//!
//! One command per line. Times accept milliseconds or human forms
//! (`4300`, `4300ms`, `4.3s`, `1:02.5`).

use crate::engine::{MediaSource, PlaybackEngine};
use crate::error::{Error, Result};
use crate::gate::{StopOutcome, WindowId};
use crate::session::{AlarmSession, GateStatus};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;
use ultra_common::human_time::{format_millis, parse_millis};

pub const HELP: &str = "\
commands:
  load <source>         load a file path or file:// URI
  start                 start or resume playback
  stop                  request a stop (only honored inside a window)
  force-stop            pause unconditionally
  seek <time>           move the playhead and refresh stop attempts
  add <start> <end>     add a stoppable window
  remove <index>        remove the window at <index> (see `windows`)
  remove-id <uuid>      remove the window with handle <uuid>
  limit <n>             stop attempts honored per loop (minimum 1)
  windows               list windows in scan order
  status [json]         show playback state
  help                  show this text
  quit                  tear down and exit";

/// One parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(String),
    Start,
    Stop,
    ForceStop,
    Seek(i64),
    Add { start_ms: i64, end_ms: i64 },
    /// Signed so negative input reaches the range check
    Remove(i64),
    RemoveId(WindowId),
    Limit(i64),
    Windows,
    Status { json: bool },
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        // Paths may contain spaces: take the rest of the line verbatim
        if name.eq_ignore_ascii_case("load") {
            let rest = line.trim_start()[name.len()..].trim();
            if rest.is_empty() {
                return Err(Error::Command("load needs a source (try 'help')".to_string()));
            }
            return Ok(Some(Command::Load(rest.to_string())));
        }

        let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("start" | "play", []) => Command::Start,
            ("stop", []) => Command::Stop,
            ("force-stop", []) => Command::ForceStop,
            ("seek", [time]) => Command::Seek(parse_time(time)?),
            ("add", [start, end]) => Command::Add {
                start_ms: parse_time(start)?,
                end_ms: parse_time(end)?,
            },
            ("remove", [index]) => Command::Remove(
                index
                    .parse()
                    .map_err(|_| Error::Command(format!("'{}' is not a window index", index)))?,
            ),
            ("remove-id", [id]) => Command::RemoveId(
                id.parse()
                    .map_err(|e| Error::Command(format!("'{}' is not a window id: {}", id, e)))?,
            ),
            ("limit", [n]) => Command::Limit(
                n.parse()
                    .map_err(|_| Error::Command(format!("'{}' is not a number", n)))?,
            ),
            ("windows", []) => Command::Windows,
            ("status", []) => Command::Status { json: false },
            ("status", ["json"]) => Command::Status { json: true },
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            (
                "start" | "play" | "stop" | "force-stop" | "seek" | "add" | "remove"
                | "remove-id" | "limit" | "windows" | "status" | "help" | "?" | "quit"
                | "exit",
                _,
            ) => {
                return Err(Error::Command(format!(
                    "wrong arguments for '{}' (try 'help')",
                    name
                )))
            }
            _ => {
                return Err(Error::Command(format!(
                    "unknown command '{}' (try 'help')",
                    name
                )))
            }
        };

        Ok(Some(command))
    }
}

fn parse_time(input: &str) -> Result<i64> {
    parse_millis(input).map_err(|e| Error::Command(e.to_string()))
}

/// What the console does after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Run one command against the session
pub async fn execute<E: PlaybackEngine + 'static>(
    session: &AlarmSession<E>,
    command: Command,
) -> Result<Reply> {
    debug!("Console command: {:?}", command);

    let text = match command {
        Command::Load(input) => {
            let source = MediaSource::parse(&input);
            session.load(source.clone()).await?;
            format!(
                "loaded {} ({})",
                source,
                format_millis(session.status().await.duration_ms)
            )
        }
        Command::Start => {
            if session.start().await {
                "playing".to_string()
            } else {
                "no source loaded".to_string()
            }
        }
        Command::Stop => match session.request_stop().await {
            StopOutcome::Paused { position_ms, .. } => {
                format!("stopped at {}", format_millis(position_ms))
            }
            StopOutcome::OutsideWindows { position_ms } => {
                format!("can't stop at {}", format_millis(position_ms))
            }
            StopOutcome::LimitExceeded => "ignored".to_string(),
            StopOutcome::Inactive => "no source loaded".to_string(),
        },
        Command::ForceStop => {
            if session.absolute_stop().await {
                "paused".to_string()
            } else {
                "not playing".to_string()
            }
        }
        Command::Seek(position_ms) => {
            if session.seek(position_ms).await {
                format!("seeked to {}", format_millis(session.status().await.position_ms))
            } else {
                "no source loaded".to_string()
            }
        }
        Command::Add { start_ms, end_ms } => {
            let id = session.add_window(start_ms, end_ms).await;
            format!(
                "added {}-{} ({})",
                format_millis(start_ms.min(end_ms)),
                format_millis(start_ms.max(end_ms)),
                id
            )
        }
        Command::Remove(index) => {
            let index = match usize::try_from(index) {
                Ok(index) => index,
                Err(_) => {
                    return Err(Error::IndexOutOfRange {
                        index,
                        len: session.status().await.windows.len(),
                    })
                }
            };
            let entry = session.remove_window_at(index).await?;
            format!(
                "removed {}-{}",
                format_millis(entry.window.start_ms()),
                format_millis(entry.window.end_ms())
            )
        }
        Command::RemoveId(id) => {
            let window = session.remove_window(id).await?;
            format!(
                "removed {}-{}",
                format_millis(window.start_ms()),
                format_millis(window.end_ms())
            )
        }
        Command::Limit(n) => {
            format!("attempt limit {}", session.set_attempt_limit(n).await)
        }
        Command::Windows => format_windows(&session.status().await),
        Command::Status { json: false } => format_status(&session.status().await),
        Command::Status { json: true } => serde_json::to_string(&session.status().await)
            .map_err(|e| Error::Command(format!("status serialization failed: {}", e)))?,
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
    };

    Ok(Reply::Text(text))
}

pub fn format_status(status: &GateStatus) -> String {
    format!(
        "{} {} {} / {}, attempts {}/{}, {} window(s){}",
        status.state,
        if status.playing { "playing" } else { "paused" },
        format_millis(status.position_ms),
        format_millis(status.duration_ms),
        status.attempt_count,
        status.attempt_limit,
        status.windows.len(),
        status
            .source
            .as_ref()
            .map(|source| format!(", source {}", source))
            .unwrap_or_default()
    )
}

pub fn format_windows(status: &GateStatus) -> String {
    if status.windows.is_empty() {
        return "no windows".to_string();
    }
    status
        .windows
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "#{} {}-{} {}",
                index,
                format_millis(entry.window.start_ms()),
                format_millis(entry.window.end_ms()),
                entry.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read commands until `quit` or end of input.
///
/// Parse and command errors are reported on `output` and do not end the loop.
pub async fn run<E, R, W>(session: &AlarmSession<E>, input: R, mut output: W) -> Result<()>
where
    E: PlaybackEngine + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let reply = match Command::parse(&line) {
            Ok(Some(command)) => execute(session, command).await,
            Ok(None) => continue,
            Err(e) => Err(e),
        };

        let text = match reply {
            Ok(Reply::Quit) => break,
            Ok(Reply::Text(text)) => text,
            Err(e) => format!("error: {}", e),
        };
        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}
