//! Credential vault
//!
//! The encryption boundary for tokens and webhook secrets at rest.

pub mod service;

pub use service::CredentialVault;
