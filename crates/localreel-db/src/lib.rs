//! Localreel-DB: durable storage for directory capabilities
//!
//! This crate persists the user's directory capability using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```
//! use localreel_common::DirectoryCapability;
//! use localreel_db::pool::{init_memory_pool, get_conn};
//! use localreel_db::queries::capabilities;
//!
//! let pool = init_memory_pool().unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let cap = DirectoryCapability::granted("/videos");
//! capabilities::save_capability(&conn, capabilities::DIRECTORY_HANDLE_KEY, &cap).unwrap();
//! let loaded = capabilities::get_handle(&conn, capabilities::DIRECTORY_HANDLE_KEY).unwrap();
//! assert_eq!(loaded, Some(cap));
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
