//! Authorization-flow helpers that carry no provider knowledge.

pub mod state;

pub use state::{generate_state_token, STATE_TOKEN_BYTES};
