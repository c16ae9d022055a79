//! A [`PlaybackBuffer`] that absorbs windows by writing them to an `AsyncWrite`.
//!
//! Used to pipe a stream into an external player's stdin. A window counts as
//! absorbed once it has been written and flushed.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

use crate::engine::{AppendReceipt, PlaybackBuffer};
use crate::error::{Error, Result};

/// `end_of_stream` shuts the writer down, but some writers (a child's stdin)
/// only close once dropped. Drop the buffer to be sure the reader sees EOF.
pub struct WriterBuffer<W> {
    writer: Arc<Mutex<W>>,
    updating_tx: Arc<watch::Sender<bool>>,
    updating_rx: watch::Receiver<bool>,
    ended: bool,
}

impl<W> WriterBuffer<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        let (updating_tx, updating_rx) = watch::channel(false);
        Self {
            writer: Arc::new(Mutex::new(writer)),
            updating_tx: Arc::new(updating_tx),
            updating_rx,
            ended: false,
        }
    }
}

#[async_trait]
impl<W> PlaybackBuffer for WriterBuffer<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn is_updating(&self) -> bool {
        *self.updating_rx.borrow()
    }

    async fn ready(&mut self) -> Result<()> {
        self.updating_rx
            .wait_for(|updating| !*updating)
            .await
            .map_err(|_| Error::BufferClosed)?;
        Ok(())
    }

    fn append(&mut self, window: Bytes) -> Result<AppendReceipt> {
        if self.ended {
            return Err(Error::InvalidState("append after end of stream"));
        }
        if self.is_updating() {
            return Err(Error::InvalidState("append while updating"));
        }

        self.updating_tx.send_replace(true);
        let (signal, receipt) = AppendReceipt::channel();
        let writer = Arc::clone(&self.writer);
        let updating = Arc::clone(&self.updating_tx);

        tokio::spawn(async move {
            let outcome = {
                let mut w = writer.lock().await;
                match w.write_all(&window).await {
                    Ok(()) => w.flush().await,
                    Err(e) => Err(e),
                }
            };
            updating.send_replace(false);
            signal.complete(outcome.map_err(Error::from));
        });

        Ok(receipt)
    }

    async fn end_of_stream(&mut self) -> Result<()> {
        if self.ended {
            return Ok(());
        }
        self.ready().await?;
        self.ended = true;
        self.writer.lock().await.shutdown().await?;
        Ok(())
    }
}
