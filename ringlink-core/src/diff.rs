use std::collections::HashSet;

use ringlink_rpc::RpcResult;
use tracing::{instrument, warn};

use crate::inner::Direction;
use crate::ring_manager::RingManager;

impl RingManager {
    /// Re-fetches the session's track list and stores it, without touching the ring window or any
    /// per-track subscription. Callers decide when that's safe: at `init`, whenever the DAW says
    /// the track list changed, and just before a navigation that depends on knowing how many
    /// tracks exist.
    pub(crate) async fn refresh_visible_tracks(&self) -> RpcResult<()> {
        let tracks = self.inner.song.visible_tracks().await?;
        *self.inner.visible_tracks.borrow_mut() = tracks;
        Ok(())
    }

    pub(crate) async fn subscribe_track_list_changed(&self) -> RpcResult<()> {
        let this = self.clone();
        let unsub = self
            .inner
            .song
            .on_track_list_changed(Box::new(move |_tracks| {
                let this = this.clone();
                tokio::task::spawn_local(async move {
                    if let Err(err) = this.refresh_visible_tracks().await {
                        warn!(error = %err, "failed to refresh visible tracks after a track list change");
                        return;
                    }
                    if let Err(err) = this.sync_ring_listeners().await {
                        warn!(error = %err, "failed to resync ring after a track list change");
                    }
                });
            }))
            .await?;
        self.inner.ring_subs.add("song:track_list", unsub).await;
        Ok(())
    }

    pub(crate) async fn subscribe_return_tracks_changed(&self) -> RpcResult<()> {
        let this = self.clone();
        let unsub = self
            .inner
            .song
            .on_return_tracks_changed(Box::new(move |_tracks| {
                let this = this.clone();
                tokio::task::spawn_local(async move {
                    this.rebuild_sends_for_ring().await;
                });
            }))
            .await?;
        self.inner.ring_subs.add("song:return_tracks", unsub).await;
        Ok(())
    }

    /// The core diff: compares the window computed from the current offset/width against what's
    /// currently subscribed, tears down what left, builds what entered, and replays everything
    /// that's left in place. This is the heart of the ring manager.
    #[instrument(skip(self))]
    pub async fn sync_ring_listeners(&self) -> RpcResult<()> {
        let (width, track_offset) = {
            let ring = self.inner.ring.borrow();
            (ring.width, ring.track_offset)
        };

        let window: Vec<_> = {
            let tracks = self.inner.visible_tracks.borrow();
            tracks
                .iter()
                .skip(track_offset as usize)
                .take(width as usize)
                .cloned()
                .collect()
        };
        let new_ids: Vec<_> = window.iter().map(|t| t.id()).collect();
        let new_id_set: HashSet<_> = new_ids.iter().cloned().collect();
        let old_ids = self.inner.ring.borrow().current_ring_track_ids.clone();
        let old_id_set: HashSet<_> = old_ids.iter().cloned().collect();

        for id in old_ids.iter().filter(|id| !new_id_set.contains(id)) {
            self.inner
                .ring_subs
                .remove_by_prefix(&format!("track:{id}:"))
                .await;
            self.inner.tracks.borrow_mut().remove(id);
        }

        {
            let mut ring = self.inner.ring.borrow_mut();
            ring.ring_index_by_track_id.clear();
            for (idx, id) in new_ids.iter().enumerate() {
                ring.ring_index_by_track_id.insert(id.clone(), idx);
            }
        }

        for track in window.iter().filter(|t| !old_id_set.contains(&t.id())) {
            self.build_track(track.clone()).await;
        }

        self.inner.ring.borrow_mut().current_ring_track_ids = new_ids;

        self.send_full_sync();
        Ok(())
    }

    /// Establishes the window's shape for the first time (or after a full teardown) and scopes the
    /// DAW's own push notifications to it.
    #[instrument(skip(self))]
    pub async fn setup_ring(
        &self,
        width: u32,
        scenes: u32,
        track_offset: u32,
        scene_offset: u32,
    ) -> RpcResult<()> {
        {
            let mut ring = self.inner.ring.borrow_mut();
            ring.width = width;
            ring.scenes = scenes;
            ring.track_offset = track_offset;
            ring.scene_offset = scene_offset;
        }
        self.inner.song.setup_session_box(width, scenes).await?;
        self.inner
            .song
            .set_session_offset(track_offset, scene_offset)
            .await?;
        self.sync_ring_listeners().await
    }

    /// Slides the window to an explicit offset without changing its dimensions.
    #[instrument(skip(self))]
    pub async fn set_offset(&self, track_offset: u32, scene_offset: u32) -> RpcResult<()> {
        {
            let mut ring = self.inner.ring.borrow_mut();
            ring.track_offset = track_offset;
            ring.scene_offset = scene_offset;
        }
        self.inner
            .song
            .set_session_offset(track_offset, scene_offset)
            .await?;
        self.sync_ring_listeners().await
    }

    /// Shifts the window by one track in `dir`, clamped so it never runs past the end of the
    /// (freshly refreshed) track list.
    #[instrument(skip(self))]
    pub async fn navigate_ring(&self, dir: Direction) -> RpcResult<()> {
        self.refresh_visible_tracks().await?;
        let total = self.inner.visible_tracks.borrow().len() as u32;
        let width = self.inner.ring.borrow().width;
        let max_offset = total.saturating_sub(width);

        let current = self.inner.ring.borrow().track_offset;
        let next = match dir {
            Direction::Left => current.saturating_sub(1),
            Direction::Right => (current + 1).min(max_offset),
        };
        if next == current {
            return Ok(());
        }

        let scene_offset = self.inner.ring.borrow().scene_offset;
        self.set_offset(next, scene_offset).await?;
        self.select_track_in_ring(0).await;
        Ok(())
    }
}
