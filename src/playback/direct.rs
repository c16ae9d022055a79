//! Direct mode: hand the engine the whole file as one blob.

use localreel_common::Result;
use localreel_media::{MediaObject, ObjectUrl};
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{follow_events, Player};
use crate::scanner::MediaEntry;

pub(super) async fn start(
    player: &Player,
    entry: &Arc<MediaEntry>,
) -> Result<(ObjectUrl, JoinHandle<()>)> {
    let bytes = match entry.file.read_all().await {
        Ok(bytes) => bytes,
        Err(e) => return Err(player.abort_start(None, e).await),
    };

    let url = player.registry.create(MediaObject::Blob(bytes));
    let events = match player.engine.attach(&url).await {
        Ok(events) => events,
        Err(e) => return Err(player.abort_start(Some(&url), e.into()).await),
    };

    let task = tokio::spawn(follow_events(player.context(entry, &url), events));
    Ok((url, task))
}
