//! Localreel-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across localreel:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for capabilities and sessions
//! - **Core Types**: Permission states, media kinds, delivery modes, playback states
//! - **Path Utilities**: The media extension allow-list
//! - **Error Handling**: The shared error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use localreel_common::{CapabilityId, PermissionState, Error, Result};
//! use localreel_common::paths::is_media_name;
//!
//! let id = CapabilityId::new();
//! assert!(PermissionState::Granted.is_granted());
//! assert!(is_media_name("c.MKV"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::NoCapability)
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
