//! Database query modules.
//!
//! - capabilities: marker and handle records for the chosen directory

pub mod capabilities;
