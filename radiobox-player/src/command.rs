//! Unix-socket command listener
//!
//! Physical controls (buttons, rotary encoder, remote daemons) drive the
//! appliance through a line-oriented protocol on a unix domain socket: one
//! command per line, one `ok` / `err ...` reply per line.

use crate::error::Result;
use crate::playback::PlaybackController;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

/// Control commands accepted on the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Power,
    Pause,
    Mute,
    NextChannel,
    PrevChannel,
    DefaultChannel,
}

/// Parse one command line. Whitespace is trimmed; unknown input is `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "power" => Some(Command::Power),
        "pause" => Some(Command::Pause),
        "mute" => Some(Command::Mute),
        "next" => Some(Command::NextChannel),
        "prev" => Some(Command::PrevChannel),
        "default" => Some(Command::DefaultChannel),
        _ => None,
    }
}

/// Bind the socket and accept command connections until the process exits.
///
/// A stale socket file from a previous run is removed before binding.
pub async fn serve(controller: Arc<PlaybackController>, socket_path: &Path) -> Result<()> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;
    info!("command socket listening on {}", socket_path.display());

    loop {
        let (stream, _) = listener.accept().await?;
        let ctl = Arc::clone(&controller);
        tokio::spawn(async move {
            handle_connection(ctl, stream).await;
        });
    }
}

async fn handle_connection(controller: Arc<PlaybackController>, stream: UnixStream) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("command connection read failed: {}", e);
                break;
            }
        };

        let reply = match parse_command(&line) {
            Some(command) => {
                debug!("command: {:?}", command);
                dispatch(&controller, command).await;
                "ok\n".to_string()
            }
            None => {
                warn!("unknown command: {:?}", line);
                format!("err unknown command: {}\n", line.trim())
            }
        };

        if let Err(e) = writer.write_all(reply.as_bytes()).await {
            warn!("command connection write failed: {}", e);
            break;
        }
    }
}

async fn dispatch(controller: &Arc<PlaybackController>, command: Command) {
    match command {
        Command::Power => controller.power().await,
        Command::Pause => controller.pause().await,
        Command::Mute => controller.mute().await,
        Command::NextChannel => controller.next_channel().await,
        Command::PrevChannel => controller.prev_channel().await,
        Command::DefaultChannel => controller.default_channel().await,
    }
}
