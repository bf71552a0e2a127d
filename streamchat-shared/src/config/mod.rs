//! # Configuration
//!
//! Client-side settings shared by the browser and terminal front ends.

pub mod client;

pub use client::{ClientConfig, ConfigError};
