use std::rc::Rc;

use ringlink_rpc::{Clip, DeviceParameter, RpcResult, Track};
use tracing::{instrument, warn};

use crate::events::{OutboundEvent, ParamInfo, PlayingClipInfo};
use crate::ring_manager::RingManager;

impl RingManager {
    /// Subscribes to everything the focus subsystem mirrors: the selected track, the selected
    /// parameter, and transport. Called once from `init`.
    #[instrument(skip(self))]
    pub(crate) async fn init_focus(&self) -> RpcResult<()> {
        let view = self.inner.song.view();

        let is_playing = self.inner.song.is_playing().await.unwrap_or(false);
        let is_recording = self.inner.song.record_mode().await.unwrap_or(false);
        {
            let mut focus = self.inner.focus.borrow_mut();
            focus.is_playing = is_playing;
            focus.is_recording = is_recording;
        }

        {
            let this = self.clone();
            let unsub = self
                .inner
                .song
                .on_is_playing_changed(Box::new(move |value| {
                    this.inner.focus.borrow_mut().is_playing = value;
                    let recording = this.inner.focus.borrow().is_recording;
                    (this.inner.sink)(OutboundEvent::Transport {
                        playing: value,
                        recording,
                    });
                }))
                .await?;
            self.inner.focus_subs.add("focus:is_playing", unsub).await;
        }
        {
            let this = self.clone();
            let unsub = self
                .inner
                .song
                .on_record_mode_changed(Box::new(move |value| {
                    this.inner.focus.borrow_mut().is_recording = value;
                    let playing = this.inner.focus.borrow().is_playing;
                    (this.inner.sink)(OutboundEvent::Transport {
                        playing,
                        recording: value,
                    });
                }))
                .await?;
            self.inner.focus_subs.add("focus:record_mode", unsub).await;
        }

        let selected_track = view.selected_track().await?;
        self.apply_selected_track(selected_track).await;

        let selected_param = view.selected_parameter().await?;
        self.apply_selected_parameter(selected_param).await;

        {
            let this = self.clone();
            let unsub = view
                .on_selected_track_changed(Box::new(move |track| {
                    let this = this.clone();
                    tokio::task::spawn_local(async move {
                        this.apply_selected_track(track).await;
                    });
                }))
                .await?;
            self.inner
                .focus_subs
                .add("focus:selected_track", unsub)
                .await;
        }
        {
            let this = self.clone();
            let unsub = view
                .on_selected_parameter_changed(Box::new(move |param| {
                    let this = this.clone();
                    tokio::task::spawn_local(async move {
                        this.apply_selected_parameter(param).await;
                    });
                }))
                .await?;
            self.inner
                .focus_subs
                .add("focus:selected_parameter", unsub)
                .await;
        }

        Ok(())
    }

    /// Replays the focus snapshot from cache, without touching the DAW. Used by
    /// `request_full_state`.
    pub(crate) fn emit_focus_snapshot(&self) {
        let focus = self.inner.focus.borrow();
        (self.inner.sink)(OutboundEvent::Selected {
            ring_index: focus.selected_track_index,
            name: focus.selected_track_name.clone(),
            color: focus.selected_track_color,
        });
        if focus.playing_slot_index >= 0 {
            (self.inner.sink)(OutboundEvent::PlayingClip(Some(PlayingClipInfo {
                name: focus.playing_clip_name.clone(),
                color: focus.playing_clip_color,
            })));
        } else {
            (self.inner.sink)(OutboundEvent::PlayingClip(None));
        }
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
        (self.inner.sink)(OutboundEvent::Transport {
            playing: focus.is_playing,
            recording: focus.is_recording,
        });
    }

    #[instrument(skip(self, track))]
    async fn apply_selected_track(&self, track: Option<Rc<dyn Track>>) {
        self.inner.focus_subs.remove_by_prefix("focus:clip:").await;
        self.inner
            .focus_subs
            .remove("focus:playing_slot_index")
            .await;
        self.inner
            .focus_subs
            .remove_by_prefix("focus:selected_track_prop:")
            .await;

        let (index, id, name, color) = match &track {
            Some(track) => {
                let id = track.id();
                let ring_index = self
                    .inner
                    .ring
                    .borrow()
                    .ring_index_by_track_id
                    .get(&id)
                    .copied();
                let name = track.name().await.unwrap_or_default();
                let color = track.color().await.map(|c| c.to_rgb()).unwrap_or_default();
                (
                    ring_index.map(|i| i as i32).unwrap_or(-1),
                    Some(id),
                    name,
                    color,
                )
            }
            None => (-1, None, String::new(), Default::default()),
        };

        {
            let mut focus = self.inner.focus.borrow_mut();
            focus.selected_track_index = index;
            focus.selected_track_id = id;
            focus.selected_track_name = name.clone();
            focus.selected_track_color = color;
        }
        (self.inner.sink)(OutboundEvent::Selected {
            ring_index: index,
            name,
            color,
        });

        let Some(track) = track else {
            self.inner.focus.borrow_mut().playing_slot_index = -1;
            (self.inner.sink)(OutboundEvent::PlayingClip(None));
            return;
        };

        self.register_selected_track_prop_listeners(&track).await;

        let slot_index = track.playing_slot_index().await.unwrap_or(-1);
        self.apply_playing_slot(&track, slot_index).await;

        let this = self.clone();
        let track_for_listener = track.clone();
        match track
            .on_playing_slot_index_changed(Box::new(move |slot_index| {
                let this = this.clone();
                let track = track_for_listener.clone();
                tokio::task::spawn_local(async move {
                    this.apply_playing_slot(&track, slot_index).await;
                });
            }))
            .await
        {
            Ok(unsub) => {
                self.inner
                    .focus_subs
                    .add("focus:playing_slot_index", unsub)
                    .await
            }
            Err(err) => warn!(error = %err, "failed to subscribe to playing slot index"),
        }
    }

    /// Keeps `RtSelected` current while the same track stays focused: a rename or recolor of the
    /// selected track updates the cached focus name/color and re-emits `Selected`, same as a
    /// change in the selection itself.
    async fn register_selected_track_prop_listeners(&self, track: &Rc<dyn Track>) {
        let this = self.clone();
        if let Ok(unsub) = track
            .on_name_changed(Box::new(move |name| {
                let mut focus = this.inner.focus.borrow_mut();
                focus.selected_track_name = name.clone();
                let ring_index = focus.selected_track_index;
                let color = focus.selected_track_color;
                drop(focus);
                (this.inner.sink)(OutboundEvent::Selected {
                    ring_index,
                    name,
                    color,
                });
            }))
            .await
        {
            self.inner
                .focus_subs
                .add("focus:selected_track_prop:name", unsub)
                .await;
        }

        let this = self.clone();
        if let Ok(unsub) = track
            .on_color_changed(Box::new(move |color| {
                let rgb = color.to_rgb();
                let mut focus = this.inner.focus.borrow_mut();
                focus.selected_track_color = rgb;
                let ring_index = focus.selected_track_index;
                let name = focus.selected_track_name.clone();
                drop(focus);
                (this.inner.sink)(OutboundEvent::Selected {
                    ring_index,
                    name,
                    color: rgb,
                });
            }))
            .await
        {
            self.inner
                .focus_subs
                .add("focus:selected_track_prop:color", unsub)
                .await;
        }
    }

    async fn apply_playing_slot(&self, track: &Rc<dyn Track>, slot_index: i32) {
        self.inner.focus_subs.remove_by_prefix("focus:clip:").await;
        self.inner.focus.borrow_mut().playing_slot_index = slot_index;

        if slot_index < 0 {
            (self.inner.sink)(OutboundEvent::PlayingClip(None));
            return;
        }

        let clip = match track.clip_slot(slot_index as u32).await {
            Ok(clip) => clip,
            Err(err) => {
                warn!(error = %err, "failed to fetch playing clip slot");
                None
            }
        };

        let Some(clip) = clip else {
            (self.inner.sink)(OutboundEvent::PlayingClip(None));
            return;
        };

        let name = clip.name().await.unwrap_or_default();
        let color = clip.color().await.map(|c| c.to_rgb()).unwrap_or_default();
        {
            let mut focus = self.inner.focus.borrow_mut();
            focus.playing_clip_name = name.clone();
            focus.playing_clip_color = color;
        }
        (self.inner.sink)(OutboundEvent::PlayingClip(Some(PlayingClipInfo {
            name,
            color,
        })));

        self.register_clip_listeners(clip).await;
    }

    async fn register_clip_listeners(&self, clip: Rc<dyn Clip>) {
        let this = self.clone();
        let clip_for_color = clip.clone();
        if let Ok(unsub) = clip
            .on_name_changed(Box::new(move |name| {
                let this = this.clone();
                tokio::task::spawn_local(async move {
                    let color = this.inner.focus.borrow().playing_clip_color;
                    this.inner.focus.borrow_mut().playing_clip_name = name.clone();
                    (this.inner.sink)(OutboundEvent::PlayingClip(Some(PlayingClipInfo {
                        name,
                        color,
                    })));
                });
            }))
            .await
        {
            self.inner.focus_subs.add("focus:clip:name", unsub).await;
        }

        let this = self.clone();
        if let Ok(unsub) = clip_for_color
            .on_color_changed(Box::new(move |color| {
                let rgb = color.to_rgb();
                let this = this.clone();
                tokio::task::spawn_local(async move {
                    let name = this.inner.focus.borrow().playing_clip_name.clone();
                    this.inner.focus.borrow_mut().playing_clip_color = rgb;
                    (this.inner.sink)(OutboundEvent::PlayingClip(Some(PlayingClipInfo {
                        name,
                        color: rgb,
                    })));
                });
            }))
            .await
        {
            self.inner.focus_subs.add("focus:clip:color", unsub).await;
        }
    }

    /// Implements the switching guard: bumps the generation before doing any awaiting, and
    /// discards its own result on completion if a later call has since bumped it further —
    /// whichever selection change happened last wins, not whichever finishes fetching last.
    #[instrument(skip(self, param))]
    async fn apply_selected_parameter(&self, param: Option<Rc<dyn DeviceParameter>>) {
        let generation = {
            let mut switch = self.inner.param_switch.borrow_mut();
            switch.generation += 1;
            switch.switching = true;
            switch.generation
        };

        self.inner
            .focus_subs
            .remove("focus:selected_parameter_value")
            .await;

        let Some(param) = param else {
            if self.inner.param_switch.borrow().generation == generation {
                let mut focus = self.inner.focus.borrow_mut();
                focus.selected_param = None;
                focus.selected_param_name.clear();
                focus.selected_param_value = 0.0;
                focus.selected_param_min = 0.0;
                focus.selected_param_max = 0.0;
                focus.selected_param_default = 0.0;
                drop(focus);
                (self.inner.sink)(OutboundEvent::Param(None));
                self.inner.param_switch.borrow_mut().switching = false;
            }
            return;
        };

        let metadata = async {
            let name = param.name().await?;
            let value = param.value().await?;
            let min = param.min().await?;
            let max = param.max().await?;
            let default_value = param.default_value().await?;
            Ok::<_, ringlink_rpc::RpcError>((name, value, min, max, default_value))
        }
        .await;

        if self.inner.param_switch.borrow().generation != generation {
            // Superseded by a newer selection while we were fetching; drop this result.
            return;
        }

        let (name, value, min, max, default_value) = match metadata {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(error = %err, "failed to fetch selected parameter metadata, treating selection as null");
                let mut focus = self.inner.focus.borrow_mut();
                focus.selected_param = None;
                focus.selected_param_name.clear();
                focus.selected_param_value = 0.0;
                focus.selected_param_min = 0.0;
                focus.selected_param_max = 0.0;
                focus.selected_param_default = 0.0;
                drop(focus);
                (self.inner.sink)(OutboundEvent::Param(None));
                self.inner.param_switch.borrow_mut().switching = false;
                return;
            }
        };

        {
            let mut focus = self.inner.focus.borrow_mut();
            focus.selected_param = Some(param.clone());
            focus.selected_param_name = name.clone();
            focus.selected_param_value = value;
            focus.selected_param_min = min;
            focus.selected_param_max = max;
            focus.selected_param_default = default_value;
        }
        (self.inner.sink)(OutboundEvent::Param(Some(ParamInfo {
            name,
            value,
            normalized: normalize_param(value, min, max),
            min,
            max,
        })));

        let this = self.clone();
        match param
            .on_value_changed(Box::new(move |value| {
                if this.inner.param_switch.borrow().generation != generation {
                    return;
                }
                this.inner.focus.borrow_mut().selected_param_value = value;
                let focus = this.inner.focus.borrow();
                (this.inner.sink)(OutboundEvent::Param(Some(ParamInfo {
                    name: focus.selected_param_name.clone(),
                    value,
                    normalized: normalize_param(value, focus.selected_param_min, focus.selected_param_max),
                    min: focus.selected_param_min,
                    max: focus.selected_param_max,
                })));
            }))
            .await
        {
            Ok(unsub) => {
                self.inner
                    .focus_subs
                    .add("focus:selected_parameter_value", unsub)
                    .await
            }
            Err(err) => warn!(error = %err, "failed to subscribe to selected parameter value"),
        }

        if self.inner.param_switch.borrow().generation == generation {
            self.inner.param_switch.borrow_mut().switching = false;
        }
    }
}

pub(crate) fn normalize_param(value: f64, min: f64, max: f64) -> f64 {
    ((value - min) / (max - min).max(f64::EPSILON)).clamp(0.0, 1.0)
}
