// NicLink - Chessnut board CLI library
// Command-line definitions and handlers shared by the binary and its tests

pub mod cli;
pub mod commands;
