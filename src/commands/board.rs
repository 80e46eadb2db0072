//! Board control command handlers (LEDs, beep, mode).
//!
//! Arguments are validated before waiting for a board, so a typo fails
//! immediately instead of after the connect handshake.

use niclink_board::led::ROWS;
use niclink_board::{CancelFlag, LedMatrix, Position, SessionConfig, Signal, Square};

use super::query::first_position;
use super::{hold as hold_session, open_board, with_board, CommandResult};
use crate::cli::ModeArg;

/// Switch one square's LED
pub async fn led(
    config: SessionConfig,
    cancel: &CancelFlag,
    x: i64,
    y: i64,
    on: bool,
    hold: u64,
) -> CommandResult {
    let square = Square::new(x, y)?;
    with_board(config, cancel, hold, |link| {
        link.set_led(x, y, on)?;
        println!("{square} {}", if on { "on" } else { "off" });
        Ok(())
    })
    .await
}

/// Set every LED from eight bit strings
pub async fn leds(
    config: SessionConfig,
    cancel: &CancelFlag,
    rows: Vec<String>,
    hold: u64,
) -> CommandResult {
    let count = rows.len();
    let rows: [String; ROWS] = rows
        .try_into()
        .map_err(|_| format!("expected {ROWS} rows, got {count}"))?;
    let matrix = LedMatrix::from_bit_strings(rows.clone())?;
    with_board(config, cancel, hold, |link| {
        link.set_all_leds(rows)?;
        println!("{matrix}");
        Ok(())
    })
    .await
}

pub async fn lights_out(config: SessionConfig, cancel: &CancelFlag) -> CommandResult {
    with_board(config, cancel, 0, |link| Ok(link.lights_out()?)).await
}

pub async fn gameover(config: SessionConfig, cancel: &CancelFlag, hold: u64) -> CommandResult {
    with_board(config, cancel, hold, |link| {
        link.gameover_lights()?;
        println!("{}", LedMatrix::GAME_OVER);
        Ok(())
    })
    .await
}

pub async fn signal(
    config: SessionConfig,
    cancel: &CancelFlag,
    number: u8,
    hold: u64,
) -> CommandResult {
    let signal = Signal::from_u8(number).ok_or_else(|| format!("no signal {number} (1-5)"))?;
    with_board(config, cancel, hold, |link| {
        link.signal_lights(signal)?;
        println!("Signal {number}: {}", signal.name());
        Ok(())
    })
    .await
}

/// Light the squares of a move
pub async fn show_move(
    config: SessionConfig,
    cancel: &CancelFlag,
    uci: &str,
    hold: u64,
) -> CommandResult {
    let matrix = LedMatrix::for_move(uci)?;
    with_board(config, cancel, hold, |link| {
        link.set_move_leds(uci)?;
        println!("{matrix}");
        Ok(())
    })
    .await
}

/// Light the squares where the board differs from a reference position
pub async fn diff(
    config: SessionConfig,
    cancel: &CancelFlag,
    reference: &str,
    last_move: Option<&str>,
    wait_secs: u64,
    hold: u64,
) -> CommandResult {
    let reference: Position = reference.parse()?;
    if let Some(uci) = last_move {
        LedMatrix::for_move(uci)?;
    }

    let link = open_board(config, cancel).await?;
    let Some(current) = first_position(&link, wait_secs).await else {
        link.disconnect()?;
        return Err("board sent no position to compare".into());
    };

    let result = link.show_board_diff(&reference, &current, last_move);
    if let Ok(differs) = result {
        if differs {
            let shown = link.with_session(|session| Ok(session.leds()))?;
            println!("{shown}");
            hold_session(hold, cancel).await;
        } else {
            println!("Board matches {reference}");
        }
    }
    link.disconnect()?;
    result?;
    Ok(())
}

pub async fn beep(
    config: SessionConfig,
    cancel: &CancelFlag,
    freq_hz: u16,
    duration_ms: u16,
) -> CommandResult {
    with_board(config, cancel, 0, |link| {
        link.beep_with(freq_hz, duration_ms)?;
        // Let the tone finish before the session closes
        std::thread::sleep(std::time::Duration::from_millis(duration_ms.into()));
        Ok(())
    })
    .await
}

/// Switch mode and report the result
pub async fn mode(config: SessionConfig, cancel: &CancelFlag, mode: ModeArg) -> CommandResult {
    with_board(config, cancel, 0, |link| {
        let switched = match mode {
            ModeArg::Upload => link.upload_mode(),
            ModeArg::Realtime => link.realtime_mode(),
        };
        if !switched {
            return Err(format!("board did not accept {mode:?} mode").into());
        }
        println!("Mode: {}", link.mode());
        Ok(())
    })
    .await
}
