//! Parlance Core — shared conversation abstractions.
//!
//! This crate defines the wire payloads exchanged with a story-execution
//! engine and the capability traits a transport must implement. It contains
//! no runtime code.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod transport;
