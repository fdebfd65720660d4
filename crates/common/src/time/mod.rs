//! Wall-clock abstraction for expiry logic.

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
