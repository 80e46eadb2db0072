//! NicLink Chessboard CLI
//!
//! A command-line interface for Chessnut sensor chessboards.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use niclink::cli::{Cli, Commands};
use niclink::commands::{self, board, query};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(cli.log_directive().parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = cli.session_config();
    let cancel = commands::setup_interrupt_handler();

    match cli.command {
        None => {
            // Default: show attached boards
            query::list(false)?;
        }

        // === Query Commands ===
        Some(Commands::List { json }) => {
            query::list(json)?;
        }
        Some(Commands::Fen { wait }) => {
            query::fen(config, &cancel, wait).await?;
        }
        Some(Commands::Watch) => {
            query::watch(config, &cancel).await?;
        }

        // === LED Commands ===
        Some(Commands::Led { x, y, state, hold }) => {
            board::led(config, &cancel, x, y, state.into(), hold.hold).await?;
        }
        Some(Commands::Leds { rows, hold }) => {
            board::leds(config, &cancel, rows, hold.hold).await?;
        }
        Some(Commands::LightsOut) => {
            board::lights_out(config, &cancel).await?;
        }
        Some(Commands::Gameover { hold }) => {
            board::gameover(config, &cancel, hold.hold).await?;
        }
        Some(Commands::Signal { number, hold }) => {
            board::signal(config, &cancel, number, hold.hold).await?;
        }
        Some(Commands::Move { uci, hold }) => {
            board::show_move(config, &cancel, &uci, hold.hold).await?;
        }
        Some(Commands::Diff {
            reference,
            last_move,
            wait,
            hold,
        }) => {
            board::diff(
                config,
                &cancel,
                &reference,
                last_move.as_deref(),
                wait,
                hold.hold,
            )
            .await?;
        }

        // === Device Commands ===
        Some(Commands::Beep { freq, duration }) => {
            board::beep(config, &cancel, freq, duration).await?;
        }
        Some(Commands::Mode { mode }) => {
            board::mode(config, &cancel, mode).await?;
        }
    }

    Ok(())
}
