//! Query (read-only) command handlers.

use std::time::Duration;

use niclink_board::{CancelFlag, DiscoveredDevice, Position, SessionConfig};
use niclink_transport::{model_name, TransportDeviceInfo};
use serde::Serialize;
use tracing::warn;

use super::{open_board, Board, CommandResult};

/// One row of `niclink list --json`
#[derive(Debug, Serialize)]
pub struct BoardEntry {
    pub model: &'static str,
    pub vid: u16,
    pub pid: u16,
    pub transport: &'static str,
    pub path: String,
    pub serial: Option<String>,
}

impl From<&DiscoveredDevice> for BoardEntry {
    fn from(device: &DiscoveredDevice) -> Self {
        let info = &device.info;
        Self {
            model: model_name(info.pid),
            vid: info.vid,
            pid: info.pid,
            transport: info.transport_type.name(),
            path: info.device_path.clone(),
            serial: info.serial.clone(),
        }
    }
}

/// List attached boards
pub fn list(json: bool) -> CommandResult {
    let devices = niclink_board::list_boards()?;
    let entries: Vec<BoardEntry> = devices.iter().map(BoardEntry::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No boards found");
        return Ok(());
    }
    println!("Boards:");
    for entry in &entries {
        println!(
            "  {} VID={:04X} PID={:04X} {} path={}",
            entry.model, entry.vid, entry.pid, entry.transport, entry.path
        );
    }
    Ok(())
}

/// Wait up to `wait_secs` for the first decoded position
pub async fn first_position(link: &Board, wait_secs: u64) -> Option<Position> {
    let mut rx = link.watch_position();
    let reported = tokio::time::timeout(
        Duration::from_secs(wait_secs),
        rx.wait_for(|p| p.as_ref().is_some_and(|p| !p.is_empty())),
    )
    .await
    .is_ok_and(|r| r.is_ok());

    if !reported {
        warn!("No position report within {}s", wait_secs);
        return None;
    }
    link.position().ok()
}

/// Print the position once the first report arrives
pub async fn fen(config: SessionConfig, cancel: &CancelFlag, wait_secs: u64) -> CommandResult {
    let link = open_board(config, cancel).await?;
    let position = first_position(&link, wait_secs).await;
    link.disconnect()?;

    if let Some(position) = position {
        println!("{position}");
    }
    Ok(())
}

/// Print every position change until Ctrl-C or the board goes away
pub async fn watch(config: SessionConfig, cancel: &CancelFlag) -> CommandResult {
    let link = open_board(config, cancel).await?;
    let mut rx = link.watch_position();
    println!("Watching {} (Ctrl-C to stop)", describe(link.device_info().as_ref()));

    let mut moves = 0u64;
    while !cancel.is_cancelled() {
        match tokio::time::timeout(Duration::from_millis(200), rx.changed()).await {
            Ok(Ok(())) => {
                let current: Option<Position> = rx.borrow_and_update().clone();
                match current {
                    Some(position) if !position.is_empty() => {
                        moves += 1;
                        println!("[{moves}] {position}");
                    }
                    Some(_) => {}
                    None => break,
                }
            }
            Ok(Err(_)) => break,
            Err(_) => {
                if !link.is_connected() {
                    eprintln!("Board disconnected");
                    break;
                }
            }
        }
    }

    link.disconnect()?;
    Ok(())
}

fn describe(info: Option<&TransportDeviceInfo>) -> String {
    match info {
        Some(info) => format!("{} at {}", model_name(info.pid), info.device_path),
        None => "board".to_string(),
    }
}
