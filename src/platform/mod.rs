//! Platform API interaction module
//!
//! Authentication and transport for the platform gateway. Nothing in here
//! knows about registry resources; the registry only asks for "send this
//! request to this path" and "give me the current auth headers".
//!
//! # Module Structure
//!
//! - [`auth`] - IMS client-credentials tokens and identification headers
//! - [`client`] - Main client combining credentials, transport, and base URL
//! - [`http`] - HTTP transport with typed request failures

pub mod auth;
pub mod client;
pub mod http;
