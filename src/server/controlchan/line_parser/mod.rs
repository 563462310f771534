//! Parses a single control channel line into a [`Command`](super::command::Command).

pub mod error;
mod parser;

pub use parser::parse;
