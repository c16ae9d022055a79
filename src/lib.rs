//! Localreel - stream media from a local directory
//!
//! This library crate exposes the core functionality for integration testing.

pub mod assets;
pub mod capability;
pub mod config;
pub mod events;
pub mod library;
pub mod playback;
pub mod scanner;
pub mod server;
