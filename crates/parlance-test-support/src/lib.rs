//! Shared test doubles for the Parlance session engine.

mod clock;
mod playthrough;
mod transport;

pub use clock::FixedClock;
pub use playthrough::RecordingPlaythrough;
pub use transport::RecordingTransport;
