//! Client for the Experience Platform XDM schema registry
//!
//! Schemas, classes, field groups, data types, and behaviors are exposed as
//! lazily-fetched typed resources reachable through [`api::Api`].

pub mod api;
pub mod config;
pub mod error;
pub mod platform;
pub mod registry;

pub use error::{Result, XdmError};
