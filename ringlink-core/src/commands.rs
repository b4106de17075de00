use ringlink_rpc::{BipolarValue, NormalizedValue, TrackId};
use tracing::{instrument, warn};

use crate::active_property::ActiveProperty;
use crate::events::{OutboundEvent, ParamInfo};
use crate::focus::normalize_param;
use crate::ring_manager::RingManager;

impl RingManager {
    fn track_id_at(&self, ring_index: usize) -> Option<TrackId> {
        self.inner
            .ring
            .borrow()
            .current_ring_track_ids
            .get(ring_index)
            .cloned()
    }

    #[instrument(skip(self))]
    pub async fn toggle_mute(&self, ring_index: usize) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let (track, current) = {
            let tracks = self.inner.tracks.borrow();
            let Some(entry) = tracks.get(&id) else { return };
            (entry.track.clone(), entry.state.mute)
        };
        if let Err(err) = track.set_mute(!current).await {
            warn!(track_id = %id, error = %err, "failed to toggle mute");
        }
    }

    #[instrument(skip(self))]
    pub async fn toggle_solo(&self, ring_index: usize) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let (track, current) = {
            let tracks = self.inner.tracks.borrow();
            let Some(entry) = tracks.get(&id) else { return };
            (entry.track.clone(), entry.state.solo)
        };
        if let Err(err) = track.set_solo(!current).await {
            warn!(track_id = %id, error = %err, "failed to toggle solo");
        }
    }

    #[instrument(skip(self))]
    pub async fn toggle_arm(&self, ring_index: usize) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let (track, current, can_be_armed) = {
            let tracks = self.inner.tracks.borrow();
            let Some(entry) = tracks.get(&id) else { return };
            (entry.track.clone(), entry.state.arm, entry.state.can_be_armed)
        };
        if !can_be_armed {
            return;
        }
        if let Err(err) = track.set_arm(!current).await {
            warn!(track_id = %id, error = %err, "failed to toggle arm");
        }
    }

    #[instrument(skip(self))]
    pub async fn set_volume(&self, ring_index: usize, value: NormalizedValue) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let Some(mixer) = self.mixer_at(&id) else { return };
        if let Err(err) = mixer.set_volume(value).await {
            warn!(track_id = %id, error = %err, "failed to set volume");
        }
    }

    #[instrument(skip(self))]
    pub async fn set_panning(&self, ring_index: usize, value: BipolarValue) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let Some(mixer) = self.mixer_at(&id) else { return };
        if let Err(err) = mixer.set_panning(value).await {
            warn!(track_id = %id, error = %err, "failed to set panning");
        }
    }

    #[instrument(skip(self))]
    pub async fn set_send(&self, ring_index: usize, send_index: u32, value: NormalizedValue) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let Some(mixer) = self.mixer_at(&id) else { return };
        if let Err(err) = mixer.set_send(send_index, value).await {
            warn!(track_id = %id, send_index, error = %err, "failed to set send");
        }
    }

    fn mixer_at(&self, id: &TrackId) -> Option<std::rc::Rc<dyn ringlink_rpc::MixerDevice>> {
        self.inner.tracks.borrow().get(id).and_then(|e| e.mixer.clone())
    }

    /// Selects the track at `ring_index` as the DAW's focus, mirroring a hardware "select" button
    /// press. The focus subsystem picks up the resulting `on_selected_track_changed` event.
    #[instrument(skip(self))]
    pub async fn select_track_in_ring(&self, ring_index: usize) {
        let Some(id) = self.track_id_at(ring_index) else { return };
        let Some(track) = self.inner.tracks.borrow().get(&id).map(|e| e.track.clone()) else {
            return;
        };
        self.apply_selected_track(Some(track)).await;
    }

    pub fn set_active_property(&self, property: ActiveProperty) {
        self.inner.focus.borrow_mut().active_property = property;
    }

    pub fn active_property(&self) -> ActiveProperty {
        self.inner.focus.borrow().active_property
    }

    /// Writes an absolute encoder position (`[0, 1]`) to whatever property is currently active for
    /// `ring_index`. `SelectedParameter` ignores `ring_index` — it's a single global focus, not a
    /// per-track property — and no-ops while the parameter switch guard is engaged.
    #[instrument(skip(self))]
    pub async fn set_active_property_value(&self, ring_index: usize, raw: f64) {
        let raw = raw.clamp(0.0, 1.0);
        match self.active_property() {
            ActiveProperty::Volume => self.set_volume(ring_index, NormalizedValue::new(raw)).await,
            ActiveProperty::Panning => {
                self.set_panning(ring_index, BipolarValue::new(raw * 2.0 - 1.0))
                    .await
            }
            ActiveProperty::Send(index) => {
                self.set_send(ring_index, index, NormalizedValue::new(raw))
                    .await
            }
            ActiveProperty::SelectedParameter => self.write_selected_parameter_raw(raw).await,
        }
    }

    /// Adjusts whatever property is currently active by `delta` encoder detents.
    #[instrument(skip(self))]
    pub async fn adjust_active_property_value(&self, ring_index: usize, delta: i32) {
        let step = self.inner.config.encoder_step * delta as f64;
        match self.active_property() {
            ActiveProperty::Volume => {
                let Some(id) = self.track_id_at(ring_index) else { return };
                let Some(current) = self.inner.tracks.borrow().get(&id).map(|e| e.state.volume) else {
                    return;
                };
                self.set_volume(ring_index, NormalizedValue::new(current + step))
                    .await;
            }
            ActiveProperty::Panning => {
                let Some(id) = self.track_id_at(ring_index) else { return };
                let Some(current) = self.inner.tracks.borrow().get(&id).map(|e| e.state.panning) else {
                    return;
                };
                self.set_panning(ring_index, BipolarValue::new(current + step * 2.0))
                    .await;
            }
            ActiveProperty::Send(index) => {
                let Some(id) = self.track_id_at(ring_index) else { return };
                let Some(current) = self
                    .inner
                    .tracks
                    .borrow()
                    .get(&id)
                    .and_then(|e| e.state.sends.get(index as usize).copied())
                else {
                    return;
                };
                self.set_send(ring_index, index, NormalizedValue::new(current + step))
                    .await;
            }
            ActiveProperty::SelectedParameter => self.adjust_selected_parameter(delta).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn reset_active_property_value(&self, ring_index: usize) {
        match self.active_property() {
            ActiveProperty::Volume => {
                self.set_volume(ring_index, self.inner.config.default_reset_volume)
                    .await
            }
            ActiveProperty::Panning => self.set_panning(ring_index, BipolarValue::new(0.0)).await,
            ActiveProperty::Send(index) => {
                self.set_send(ring_index, index, NormalizedValue::new(0.0))
                    .await
            }
            ActiveProperty::SelectedParameter => self.reset_selected_parameter().await,
        }
    }

    /// Adjusts the globally selected device parameter by `delta` encoder detents, independent of
    /// whatever `active_property` is set to. No-ops while a parameter switch is in flight.
    #[instrument(skip(self))]
    pub async fn adjust_selected_parameter(&self, delta: i32) {
        if self.inner.param_switch.borrow().switching {
            warn!("ignoring selected parameter adjustment during a switch");
            return;
        }
        let (param, value, min, max) = {
            let focus = self.inner.focus.borrow();
            let Some(param) = focus.selected_param.clone() else { return };
            (param, focus.selected_param_value, focus.selected_param_min, focus.selected_param_max)
        };
        let span = (max - min).max(f64::EPSILON);
        let next = (value + self.inner.config.encoder_step * delta as f64 * span).clamp(min, max);
        if let Err(err) = param.set_value(next).await {
            warn!(error = %err, "failed to adjust selected parameter");
        }
    }

    #[instrument(skip(self))]
    pub async fn reset_selected_parameter(&self) {
        if self.inner.param_switch.borrow().switching {
            warn!("ignoring selected parameter reset during a switch");
            return;
        }
        let (param, default_value) = {
            let focus = self.inner.focus.borrow();
            let Some(param) = focus.selected_param.clone() else { return };
            (param, focus.selected_param_default)
        };
        if let Err(err) = param.set_value(default_value).await {
            warn!(error = %err, "failed to reset selected parameter");
        }
    }

    async fn write_selected_parameter_raw(&self, raw: f64) {
        if self.inner.param_switch.borrow().switching {
            warn!("ignoring selected parameter write during a switch");
            return;
        }
        let (param, min, max) = {
            let focus = self.inner.focus.borrow();
            let Some(param) = focus.selected_param.clone() else { return };
            (param, focus.selected_param_min, focus.selected_param_max)
        };
        let value = min + raw * (max - min);
        if let Err(err) = param.set_value(value).await {
            warn!(error = %err, "failed to write selected parameter");
        }
    }

    /// Re-emits the current value of whatever property is active, without touching the DAW — the
    /// hardware's "push the active property again" command. `SelectedParameter` emits a single
    /// `Param`; every other mode emits one event per ring resident, skipping MIDI tracks for
    /// volume/panning.
    #[instrument(skip(self))]
    pub fn send_active_property_state(&self) {
        match self.active_property() {
            ActiveProperty::SelectedParameter => {
                let focus = self.inner.focus.borrow();
                if focus.selected_param.is_some() {
                    (self.inner.sink)(OutboundEvent::Param(Some(ParamInfo {
                        name: focus.selected_param_name.clone(),
                        value: focus.selected_param_value,
                        normalized: normalize_param(
                            focus.selected_param_value,
                            focus.selected_param_min,
                            focus.selected_param_max,
                        ),
                        min: focus.selected_param_min,
                        max: focus.selected_param_max,
                    })));
                } else {
                    (self.inner.sink)(OutboundEvent::Param(None));
                }
            }
            ActiveProperty::Volume => {
                let ring = self.inner.ring.borrow();
                let tracks = self.inner.tracks.borrow();
                for (ring_index, id) in ring.current_ring_track_ids.iter().enumerate() {
                    let Some(entry) = tracks.get(id) else { continue };
                    if entry.state.is_midi {
                        continue;
                    }
                    (self.inner.sink)(OutboundEvent::Volume {
                        ring_index,
                        value: entry.state.volume,
                        normalized: entry.state.volume,
                    });
                }
            }
            ActiveProperty::Panning => {
                let ring = self.inner.ring.borrow();
                let tracks = self.inner.tracks.borrow();
                for (ring_index, id) in ring.current_ring_track_ids.iter().enumerate() {
                    let Some(entry) = tracks.get(id) else { continue };
                    if entry.state.is_midi {
                        continue;
                    }
                    (self.inner.sink)(OutboundEvent::Panning {
                        ring_index,
                        value: entry.state.panning,
                        normalized: (entry.state.panning + 1.0) / 2.0,
                    });
                }
            }
            ActiveProperty::Send(send_index) => {
                let ring = self.inner.ring.borrow();
                let tracks = self.inner.tracks.borrow();
                for (ring_index, id) in ring.current_ring_track_ids.iter().enumerate() {
                    let Some(entry) = tracks.get(id) else { continue };
                    let Some(value) = entry.state.sends.get(send_index as usize).copied() else {
                        continue;
                    };
                    (self.inner.sink)(OutboundEvent::Send {
                        ring_index,
                        send_index,
                        value,
                        normalized: value,
                    });
                }
            }
        }
    }

    pub async fn start_playing(&self) {
        if let Err(err) = self.inner.song.start_playing().await {
            warn!(error = %err, "failed to start playing");
        }
    }

    pub async fn stop_playing(&self) {
        if let Err(err) = self.inner.song.stop_playing().await {
            warn!(error = %err, "failed to stop playing");
        }
    }
}
