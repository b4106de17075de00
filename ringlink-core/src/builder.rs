use std::rc::Rc;

use ringlink_rpc::{MixerDevice, Track, TrackId};
use tracing::{instrument, warn};

use crate::events::OutboundEvent;
use crate::inner::TrackEntry;
use crate::ring_manager::RingManager;
use crate::track_state::TrackState;

impl RingManager {
    /// Fetches everything about one track and wires up the live listeners that keep it current.
    ///
    /// Individual property fetches and subscriptions fail independently and are logged rather than
    /// propagated: a track that can't report its send count still enters the ring with a name, a
    /// color, and mute/solo/arm wired up.
    #[instrument(skip(self, track), fields(track_id = %track.id()))]
    pub(crate) async fn build_track(&self, track: Rc<dyn Track>) {
        let id = track.id();
        let is_master = match self.inner.song.master_track().await {
            Ok(master) => master.id() == id,
            Err(_) => false,
        };

        let name = track
            .name()
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to fetch track name");
                String::new()
            });
        let color = track
            .color()
            .await
            .map(|c| c.to_rgb())
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to fetch track color");
                Default::default()
            });
        let has_midi = track.has_midi_input().await.unwrap_or(false);
        let has_audio = track.has_audio_input().await.unwrap_or(true);
        let is_midi = has_midi && !has_audio;

        let mute = if is_master {
            false
        } else {
            track.mute().await.unwrap_or(false)
        };
        let solo = if is_master {
            false
        } else {
            track.solo().await.unwrap_or(false)
        };
        let can_be_armed = track.can_be_armed().await.unwrap_or(false);
        let arm = if can_be_armed {
            track.arm().await.unwrap_or(false)
        } else {
            false
        };

        let mixer = match track.mixer_device().await {
            Ok(mixer) => Some(mixer),
            Err(err) => {
                warn!(error = %err, "track has no mixer device, entering with scalar state only");
                None
            }
        };

        let (volume, panning, sends) = match (&mixer, is_midi, is_master) {
            (Some(mixer), false, _) => {
                let volume = mixer.volume().await.map(|v| v.get()).unwrap_or(0.0);
                let panning = mixer.panning().await.map(|v| v.get()).unwrap_or(0.0);
                let sends = if is_master {
                    Vec::new()
                } else {
                    self.fetch_sends(mixer.as_ref()).await
                };
                (volume, panning, sends)
            }
            _ => (0.0, 0.0, Vec::new()),
        };

        let state = TrackState {
            name,
            color,
            is_midi,
            mute,
            solo,
            arm,
            can_be_armed,
            volume,
            panning,
            sends,
        };
        let sends_len = state.sends.len() as u32;

        self.inner.tracks.borrow_mut().insert(
            id.clone(),
            TrackEntry {
                track: track.clone(),
                mixer: mixer.clone(),
                state,
            },
        );

        self.register_name_listener(&track, &id).await;
        self.register_color_listener(&track, &id).await;
        if !is_master {
            self.register_mute_listener(&track, &id).await;
            self.register_solo_listener(&track, &id).await;
        }
        if can_be_armed {
            self.register_arm_listener(&track, &id).await;
        }
        if let Some(mixer) = &mixer {
            if !is_midi {
                self.register_volume_listener(mixer, &id).await;
                self.register_panning_listener(mixer, &id).await;
            }
            if !is_master {
                for send_index in 0..sends_len {
                    self.register_send_listener(mixer, &id, send_index).await;
                }
            }
        }
    }

    async fn fetch_sends(&self, mixer: &dyn MixerDevice) -> Vec<f64> {
        let count = mixer.send_count().await.unwrap_or(0);
        let mut sends = Vec::with_capacity(count as usize);
        for index in 0..count {
            let value = mixer.send(index).await.map(|v| v.get()).unwrap_or(0.0);
            sends.push(value);
        }
        sends
    }

    /// Rebuilds every ring resident's send listeners and cached send values in place, without
    /// touching any other subscription. Invoked when the session's return tracks change, since
    /// that's the only event that changes how many sends a track has.
    pub(crate) async fn rebuild_sends_for_ring(&self) {
        let residents: Vec<(TrackId, Rc<dyn MixerDevice>)> = self
            .inner
            .tracks
            .borrow()
            .iter()
            .filter_map(|(id, entry)| entry.mixer.clone().map(|mixer| (id.clone(), mixer)))
            .collect();

        for (id, mixer) in residents {
            self.inner
                .ring_subs
                .remove_by_prefix(&format!("track:{id}:send:"))
                .await;
            let sends = self.fetch_sends(mixer.as_ref()).await;
            let sends_len = sends.len() as u32;
            if let Some(entry) = self.inner.tracks.borrow_mut().get_mut(&id) {
                entry.state.sends = sends;
            }
            for send_index in 0..sends_len {
                self.register_send_listener(&mixer, &id, send_index).await;
            }
        }
        self.send_full_sync();
    }

    async fn register_name_listener(&self, track: &Rc<dyn Track>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = track
            .on_name_changed(Box::new(move |value| {
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.name = value.clone();
                drop(tracks);
                (inner.sink)(OutboundEvent::Info {
                    ring_index,
                    name: value,
                    color: inner
                        .tracks
                        .borrow()
                        .get(&tid)
                        .map(|e| e.state.color)
                        .unwrap_or_default(),
                    is_midi: inner
                        .tracks
                        .borrow()
                        .get(&tid)
                        .map(|e| e.state.is_midi)
                        .unwrap_or(false),
                });
            }))
            .await;
        self.store_sub(result, id, "name").await;
    }

    async fn register_color_listener(&self, track: &Rc<dyn Track>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = track
            .on_color_changed(Box::new(move |value| {
                let rgb = value.to_rgb();
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.color = rgb;
                let name = entry.state.name.clone();
                let is_midi = entry.state.is_midi;
                drop(tracks);
                (inner.sink)(OutboundEvent::Info {
                    ring_index,
                    name,
                    color: rgb,
                    is_midi,
                });
            }))
            .await;
        self.store_sub(result, id, "color").await;
    }

    async fn register_mute_listener(&self, track: &Rc<dyn Track>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = track
            .on_mute_changed(Box::new(move |value| {
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.mute = value;
                drop(tracks);
                (inner.sink)(OutboundEvent::Mute { ring_index, value });
            }))
            .await;
        self.store_sub(result, id, "mute").await;
    }

    async fn register_solo_listener(&self, track: &Rc<dyn Track>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = track
            .on_solo_changed(Box::new(move |value| {
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.solo = value;
                drop(tracks);
                (inner.sink)(OutboundEvent::Solo { ring_index, value });
            }))
            .await;
        self.store_sub(result, id, "solo").await;
    }

    async fn register_arm_listener(&self, track: &Rc<dyn Track>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = track
            .on_arm_changed(Box::new(move |value| {
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.arm = value;
                drop(tracks);
                (inner.sink)(OutboundEvent::Arm { ring_index, value });
            }))
            .await;
        self.store_sub(result, id, "arm").await;
    }

    async fn register_volume_listener(&self, mixer: &Rc<dyn MixerDevice>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = mixer
            .on_volume_changed(Box::new(move |value| {
                let value = value.get();
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.volume = value;
                drop(tracks);
                (inner.sink)(OutboundEvent::Volume {
                    ring_index,
                    value,
                    normalized: value,
                });
            }))
            .await;
        self.store_sub(result, id, "volume").await;
    }

    async fn register_panning_listener(&self, mixer: &Rc<dyn MixerDevice>, id: &TrackId) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = mixer
            .on_panning_changed(Box::new(move |value| {
                let value = value.get();
                let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                    return;
                };
                let mut tracks = inner.tracks.borrow_mut();
                let Some(entry) = tracks.get_mut(&tid) else { return };
                entry.state.panning = value;
                drop(tracks);
                (inner.sink)(OutboundEvent::Panning {
                    ring_index,
                    value,
                    normalized: (value + 1.0) / 2.0,
                });
            }))
            .await;
        self.store_sub(result, id, "panning").await;
    }

    async fn register_send_listener(&self, mixer: &Rc<dyn MixerDevice>, id: &TrackId, send_index: u32) {
        let inner = self.inner.clone();
        let tid = id.clone();
        let result = mixer
            .on_send_changed(
                send_index,
                Box::new(move |value| {
                    let value = value.get();
                    let Some(ring_index) = inner.ring.borrow().ring_index_by_track_id.get(&tid).copied() else {
                        return;
                    };
                    let mut tracks = inner.tracks.borrow_mut();
                    let Some(entry) = tracks.get_mut(&tid) else { return };
                    if let Some(slot) = entry.state.sends.get_mut(send_index as usize) {
                        *slot = value;
                    }
                    drop(tracks);
                    (inner.sink)(OutboundEvent::Send {
                        ring_index,
                        send_index,
                        value,
                        normalized: value,
                    });
                }),
            )
            .await;
        self.store_sub(result, id, &format!("send:{send_index}"))
            .await;
    }

    async fn store_sub(
        &self,
        result: ringlink_rpc::RpcResult<ringlink_rpc::Unsubscribe>,
        id: &TrackId,
        property: &str,
    ) {
        match result {
            Ok(unsub) => {
                self.inner
                    .ring_subs
                    .add(format!("track:{id}:{property}"), unsub)
                    .await
            }
            Err(err) => {
                warn!(track_id = %id, property, error = %err, "failed to subscribe")
            }
        }
    }
}
