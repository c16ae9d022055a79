//! Chunked mode: stream the file through the engine's playback buffer.

use localreel_common::{Error, PlaybackState, Result};
use localreel_media::{
    descriptor_for_name, ChunkedFeeder, EngineEvent, EngineEvents, Error as MediaError,
    FeedProgress, MediaObject, ObjectUrl, PlaybackBuffer,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{engine_closed, failure_status, follow_events, Player, SessionContext};
use crate::events::StatusPayload;
use crate::scanner::MediaEntry;

pub(super) async fn start(
    player: &Player,
    entry: &Arc<MediaEntry>,
) -> Result<(ObjectUrl, JoinHandle<()>)> {
    let descriptor = descriptor_for_name(&entry.name);
    let url = player.registry.create(MediaObject::Stream(descriptor));

    let events = match player.engine.attach(&url).await {
        Ok(events) => events,
        Err(e) => return Err(player.abort_start(Some(&url), e.into()).await),
    };

    if !player.engine.is_type_supported(&descriptor) {
        let err = Error::unsupported_format(descriptor.as_str());
        return Err(player.abort_start(Some(&url), err).await);
    }

    let buffer = match player.engine.add_source_buffer(&descriptor).await {
        Ok(buffer) => buffer,
        Err(e) => return Err(player.abort_start(Some(&url), e.into()).await),
    };
    debug!("Streaming {} as {}", entry.name, descriptor);

    let ctx = player.context(entry, &url);
    let task = tokio::spawn(drive(ctx, events, buffer, player.feeder));
    Ok((url, task))
}

/// Feed the file while watching engine events, then follow events to the end.
async fn drive(
    ctx: SessionContext,
    mut events: EngineEvents,
    mut buffer: Box<dyn PlaybackBuffer>,
    feeder: ChunkedFeeder,
) {
    let mut file = match ctx.entry.file.open().await {
        Ok(file) => file,
        Err(e) => return ctx.fail(failure_status(&e)),
    };
    let total = ctx.entry.file.size();
    let status = Arc::clone(&ctx.status);

    let outcome = {
        let feed = feeder.feed(&mut file, total, buffer.as_mut(), move |p: FeedProgress| {
            status.publish(StatusPayload::Progress { percent: p.percent })
        });
        tokio::pin!(feed);

        loop {
            tokio::select! {
                result = &mut feed => break result,
                event = events.recv() => match event {
                    Some(EngineEvent::LoadedMetadata) => ctx.set_state(PlaybackState::Playing),
                    Some(EngineEvent::Ended) => return ctx.ended(),
                    Some(EngineEvent::Error(message)) => {
                        return ctx.fail(StatusPayload::Failed { message })
                    }
                    None => return ctx.fail(engine_closed()),
                },
            }
        }
    };

    // Closes the engine's input so it sees the end of the stream.
    drop(buffer);

    match outcome {
        Ok(summary) => {
            debug!(
                "Fed {} bytes of {} in {} windows",
                summary.bytes, ctx.entry.name, summary.windows
            );
            ctx.playing();
        }
        Err(e) => {
            let err = match e {
                MediaError::Read { source, .. } => {
                    Error::read_failure(ctx.entry.file.path(), source)
                }
                other => Error::from(other),
            };
            return ctx.fail(failure_status(&err));
        }
    }

    follow_events(ctx, events).await;
}
