//! OAuth authorization flows

pub mod flow;
pub mod ports;
pub mod service;
pub mod state;

pub use flow::{FlowFailure, FlowStage};
pub use ports::OAuthStateStore;
pub use service::{Disconnected, InitRequest, OAuthOrchestrator};
pub use state::StateManager;
