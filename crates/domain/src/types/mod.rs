//! Domain types

pub mod events;
pub mod integration;
pub mod oauth;
pub mod provider;
pub mod webhook;

pub use events::*;
pub use integration::*;
pub use oauth::*;
pub use provider::*;
pub use webhook::*;
