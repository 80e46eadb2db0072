// CLI definitions using clap

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use niclink_board::led::ROWS;
use niclink_board::SessionConfig;

#[derive(Parser, Debug)]
#[command(name = "niclink")]
#[command(author, version, about = "Chessnut sensor chessboard driver")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Give up if no board appears within this many seconds (default: wait forever)
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Pause after opening the board before the first command
    #[arg(long, global = true, value_name = "MS", default_value_t = 2000)]
    pub settle_ms: u64,

    /// Don't beep when connecting
    #[arg(long, global = true)]
    pub no_beep: bool,

    /// Log wire traffic (same as RUST_LOG=niclink=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Session settings from the global flags
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            settle_delay: Duration::from_millis(self.settle_ms),
            connect_timeout: self.timeout.map(Duration::from_secs),
            beep_on_connect: !self.no_beep,
            ..SessionConfig::default()
        }
    }

    /// Default tracing directive for this invocation
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "niclink=debug"
        } else {
            "niclink=info"
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Query Commands ===
    /// List attached boards
    #[command(visible_aliases = ["ls"])]
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the current position
    #[command(visible_aliases = ["position", "pos"])]
    Fen {
        /// Seconds to wait for the first position report
        #[arg(long, default_value_t = 3)]
        wait: u64,
    },

    /// Print every position change until Ctrl-C
    #[command(visible_alias = "w")]
    Watch,

    // === LED Commands ===
    /// Switch one square's LED (x = row from rank 8, y = bit from file h)
    Led {
        /// Row 0-7 (0 = rank 8)
        #[arg(allow_negative_numbers = true)]
        x: i64,
        /// Bit 0-7 (0 = file h)
        #[arg(allow_negative_numbers = true)]
        y: i64,
        /// New state
        state: LedState,
        #[command(flatten)]
        hold: HoldArgs,
    },

    /// Set every LED from eight bit strings, rank 8 first
    #[command(visible_alias = "all")]
    Leds {
        /// Eight rows like 10000001
        #[arg(num_args = ROWS, required = true, value_name = "ROW")]
        rows: Vec<String>,
        #[command(flatten)]
        hold: HoldArgs,
    },

    /// Turn every LED off
    #[command(visible_alias = "off")]
    LightsOut,

    /// Show the game over pattern
    Gameover {
        #[command(flatten)]
        hold: HoldArgs,
    },

    /// Show a signal pattern (1 ring, 2 left half, 3 right half, 4 center line, 5 center cross)
    Signal {
        #[arg(value_parser = clap::value_parser!(u8).range(1..6))]
        number: u8,
        #[command(flatten)]
        hold: HoldArgs,
    },

    /// Light the origin and destination of a move like e2e4
    #[command(name = "move", visible_alias = "mv")]
    Move {
        uci: String,
        #[command(flatten)]
        hold: HoldArgs,
    },

    /// Light the squares where the board differs from a position
    Diff {
        /// Expected position (piece placement or full FEN)
        reference: String,
        /// Keep this move's squares lit, e.g. e2e4
        #[arg(long, value_name = "UCI")]
        last_move: Option<String>,
        /// Seconds to wait for the board's first position report
        #[arg(long, default_value_t = 3)]
        wait: u64,
        #[command(flatten)]
        hold: HoldArgs,
    },

    // === Device Commands ===
    /// Beep
    Beep {
        /// Frequency in Hz
        #[arg(long, default_value_t = 1000)]
        freq: u16,
        /// Duration in milliseconds
        #[arg(long, default_value_t = 200)]
        duration: u16,
    },

    /// Switch the board's operating mode
    Mode { mode: ModeArg },
}

/// How long LED commands keep the session open
#[derive(clap::Args, Debug, Clone, Copy)]
pub struct HoldArgs {
    /// Seconds to keep the lights on before disconnecting (Ctrl-C ends early)
    #[arg(long, default_value_t = 5, value_name = "SECONDS")]
    pub hold: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    On,
    Off,
}

impl From<LedState> for bool {
    fn from(state: LedState) -> Self {
        matches!(state, LedState::On)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Accept LED and beep commands
    Upload,
    /// Push position reports
    Realtime,
}
