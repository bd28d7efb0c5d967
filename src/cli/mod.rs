//! Command-line front end: argument parsing and the command handler.
mod app;
mod main;

pub use app::*;
pub use main::*;
