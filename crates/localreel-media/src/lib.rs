//! Localreel-Media: bounded-memory delivery of local media files
//!
//! This crate holds the playback-side machinery that does not care where a
//! file came from:
//!
//! # Modules
//!
//! - `descriptor` - Static extension → MIME/codec descriptor table
//! - `cursor` - The window plan for one feed run
//! - `engine` - Seams to the playback engine and its append buffer
//! - `feeder` - The chunked feeder with strict one-window-in-flight backpressure
//! - `object_url` - Revocable URLs naming in-memory blobs and stream sources
//! - `sink` - A `PlaybackBuffer` over any `AsyncWrite`
//!
//! # Architecture
//!
//! A chunked feed reads a file window by window and appends each window to a
//! playback buffer. The feeder never has more than one window in flight:
//!
//! 1. Read `min(window, remaining)` bytes at the cursor
//! 2. Wait for the buffer to stop updating
//! 3. Append, then wait for the append to be absorbed
//! 4. Advance the cursor and publish progress
//!
//! When the cursor reaches the end the buffer is told end-of-stream.

pub mod cursor;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod feeder;
pub mod object_url;
pub mod sink;

pub use cursor::{ChunkCursor, Window, DEFAULT_WINDOW_LEN};
pub use descriptor::{descriptor_for_name, Descriptor};
pub use engine::{AppendReceipt, AppendSignal, EngineEvent, EngineEvents, PlaybackBuffer, PlaybackEngine};
pub use error::{Error, Result};
pub use feeder::{ChunkedFeeder, FeedProgress, FeedSummary};
pub use object_url::{MediaObject, ObjectRegistry, ObjectUrl};
pub use sink::WriterBuffer;
