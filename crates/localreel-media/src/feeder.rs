//! Chunked feeding with one window in flight.

use bytes::Bytes;
use std::io::SeekFrom;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::{debug, trace};

use crate::cursor::{ChunkCursor, Window, DEFAULT_WINDOW_LEN};
use crate::engine::PlaybackBuffer;
use crate::error::{Error, Result};

/// Progress after a window has been absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedProgress {
    pub offset: u64,
    pub total: u64,
    pub percent: u8,
}

/// Outcome of a completed feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSummary {
    pub windows: usize,
    pub bytes: u64,
}

/// Reads a source window by window and appends each to a playback buffer.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedFeeder {
    window: u64,
}

impl Default for ChunkedFeeder {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW_LEN,
        }
    }
}

impl ChunkedFeeder {
    /// Create a feeder with the given window length in bytes.
    pub fn new(window: u64) -> Result<Self> {
        if window == 0 {
            return Err(Error::InvalidWindow(window));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    /// Feed `total` bytes from `reader` into `buffer`, then end the stream.
    ///
    /// Each window is appended only after the buffer has stopped updating,
    /// and the next window is read only after the append has been absorbed.
    /// On failure the loop stops where it is; windows already appended stay
    /// in the buffer.
    pub async fn feed<R, F>(
        &self,
        reader: &mut R,
        total: u64,
        buffer: &mut dyn PlaybackBuffer,
        mut on_progress: F,
    ) -> Result<FeedSummary>
    where
        R: AsyncRead + AsyncSeek + Unpin + Send,
        F: FnMut(FeedProgress) + Send,
    {
        let mut cursor = ChunkCursor::new(total, self.window)?;
        let mut windows = 0;

        while let Some(window) = cursor.next_window() {
            let bytes = read_window(reader, window).await?;

            if buffer.is_updating() {
                trace!(offset = window.offset, "Waiting for playback buffer");
                buffer.ready().await?;
            }

            buffer.append(bytes)?.absorbed().await?;

            cursor.advance(window);
            windows += 1;
            on_progress(FeedProgress {
                offset: cursor.offset(),
                total,
                percent: cursor.percent(),
            });
        }

        buffer.end_of_stream().await?;
        debug!(windows, bytes = total, "Feed complete");

        Ok(FeedSummary {
            windows,
            bytes: total,
        })
    }
}

async fn read_window<R>(reader: &mut R, window: Window) -> Result<Bytes>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    let read_err = |source| Error::Read {
        offset: window.offset,
        source,
    };

    reader
        .seek(SeekFrom::Start(window.offset))
        .await
        .map_err(read_err)?;

    let mut buf = vec![0u8; window.len as usize];
    reader.read_exact(&mut buf).await.map_err(read_err)?;
    Ok(Bytes::from(buf))
}
