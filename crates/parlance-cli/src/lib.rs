//! Parlance CLI — replays a JSON-scripted narrative through an in-process
//! engine and prints the resulting conversation.

pub mod config;
pub mod engine;
pub mod error;
pub mod runner;
pub mod script;
