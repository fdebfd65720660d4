//! Provider adapter port and dispatch

pub mod ports;
pub mod registry;
pub mod token_kind;

pub use ports::{ProviderAdapter, SignatureHeaders, TokenGrant};
pub use registry::ProviderRegistry;
pub use token_kind::{classify_github_token, GitHubTokenKind};
