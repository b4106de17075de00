use std::rc::Rc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::RpcResult;
use crate::types::{BipolarValue, DawColor, NormalizedValue, TrackId};

/// What a listener registration hands back: call it to tear the listener down.
///
/// Modeled as an owned, one-shot async closure rather than a trait object with a `remove` method
/// because the collaborator that actually talks to the DAW is free to capture whatever private
/// bookkeeping it needs (a subscription id, a channel handle) without the core ever seeing it.
pub type Unsubscribe = Box<dyn FnOnce() -> BoxFuture<'static, RpcResult<()>>>;

pub type BoolListener = Box<dyn Fn(bool)>;
pub type StringListener = Box<dyn Fn(String)>;
pub type ColorListener = Box<dyn Fn(DawColor)>;
pub type IntListener = Box<dyn Fn(i32)>;
pub type NormalizedListener = Box<dyn Fn(NormalizedValue)>;
pub type BipolarListener = Box<dyn Fn(BipolarValue)>;
pub type ValueListener = Box<dyn Fn(f64)>;
pub type TrackListListener = Box<dyn Fn(Vec<Rc<dyn Track>>)>;
pub type OptionTrackListener = Box<dyn Fn(Option<Rc<dyn Track>>)>;
pub type OptionParamListener = Box<dyn Fn(Option<Rc<dyn DeviceParameter>>)>;

/// The DAW's top-level session object ("song"). Entry point the injected collaborator hands to
/// the core at construction time.
#[async_trait(?Send)]
pub trait Song {
    async fn tracks(&self) -> RpcResult<Vec<Rc<dyn Track>>>;
    async fn return_tracks(&self) -> RpcResult<Vec<Rc<dyn Track>>>;
    async fn visible_tracks(&self) -> RpcResult<Vec<Rc<dyn Track>>>;
    async fn master_track(&self) -> RpcResult<Rc<dyn Track>>;
    async fn is_playing(&self) -> RpcResult<bool>;
    async fn record_mode(&self) -> RpcResult<bool>;
    async fn start_playing(&self) -> RpcResult<()>;
    async fn stop_playing(&self) -> RpcResult<()>;

    /// Scopes the DAW's own push notifications to our window.
    async fn setup_session_box(&self, width: u32, height: u32) -> RpcResult<()>;
    async fn set_session_offset(&self, track_offset: u32, scene_offset: u32) -> RpcResult<()>;

    async fn on_track_list_changed(&self, listener: TrackListListener) -> RpcResult<Unsubscribe>;
    async fn on_return_tracks_changed(
        &self,
        listener: TrackListListener,
    ) -> RpcResult<Unsubscribe>;
    async fn on_is_playing_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe>;
    async fn on_record_mode_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe>;

    fn view(&self) -> Rc<dyn SongView>;
}

/// `song.view` — the user's current focus within the session, as opposed to the session's
/// contents.
#[async_trait(?Send)]
pub trait SongView {
    async fn selected_track(&self) -> RpcResult<Option<Rc<dyn Track>>>;
    async fn selected_parameter(&self) -> RpcResult<Option<Rc<dyn DeviceParameter>>>;
    async fn selected_scene(&self) -> RpcResult<u32>;

    async fn on_selected_track_changed(
        &self,
        listener: OptionTrackListener,
    ) -> RpcResult<Unsubscribe>;
    async fn on_selected_parameter_changed(
        &self,
        listener: OptionParamListener,
    ) -> RpcResult<Unsubscribe>;
}

#[async_trait(?Send)]
pub trait Track {
    /// Stable regardless of position, folding, or rename — what the core keys caches by.
    fn id(&self) -> TrackId;

    async fn name(&self) -> RpcResult<String>;
    async fn set_name(&self, name: &str) -> RpcResult<()>;
    async fn color(&self) -> RpcResult<DawColor>;
    async fn mute(&self) -> RpcResult<bool>;
    async fn set_mute(&self, value: bool) -> RpcResult<()>;
    async fn solo(&self) -> RpcResult<bool>;
    async fn set_solo(&self, value: bool) -> RpcResult<()>;
    async fn arm(&self) -> RpcResult<bool>;
    async fn set_arm(&self, value: bool) -> RpcResult<()>;
    async fn can_be_armed(&self) -> RpcResult<bool>;
    async fn has_midi_input(&self) -> RpcResult<bool>;
    async fn has_audio_input(&self) -> RpcResult<bool>;
    async fn playing_slot_index(&self) -> RpcResult<i32>;
    async fn clip_slot(&self, index: u32) -> RpcResult<Option<Rc<dyn Clip>>>;
    async fn mixer_device(&self) -> RpcResult<Rc<dyn MixerDevice>>;
    async fn fire_slot(&self, index: u32) -> RpcResult<()>;

    async fn on_name_changed(&self, listener: StringListener) -> RpcResult<Unsubscribe>;
    async fn on_color_changed(&self, listener: ColorListener) -> RpcResult<Unsubscribe>;
    async fn on_mute_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe>;
    async fn on_solo_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe>;
    async fn on_arm_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe>;
    async fn on_playing_slot_index_changed(&self, listener: IntListener) -> RpcResult<Unsubscribe>;
}

#[async_trait(?Send)]
pub trait MixerDevice {
    async fn volume(&self) -> RpcResult<NormalizedValue>;
    async fn set_volume(&self, value: NormalizedValue) -> RpcResult<()>;
    async fn panning(&self) -> RpcResult<BipolarValue>;
    async fn set_panning(&self, value: BipolarValue) -> RpcResult<()>;
    async fn send_count(&self) -> RpcResult<u32>;
    async fn send(&self, index: u32) -> RpcResult<NormalizedValue>;
    async fn set_send(&self, index: u32, value: NormalizedValue) -> RpcResult<()>;

    async fn on_volume_changed(&self, listener: NormalizedListener) -> RpcResult<Unsubscribe>;
    async fn on_panning_changed(&self, listener: BipolarListener) -> RpcResult<Unsubscribe>;
    async fn on_send_changed(
        &self,
        index: u32,
        listener: NormalizedListener,
    ) -> RpcResult<Unsubscribe>;
}

#[async_trait(?Send)]
pub trait DeviceParameter {
    async fn name(&self) -> RpcResult<String>;
    async fn value(&self) -> RpcResult<f64>;
    async fn set_value(&self, value: f64) -> RpcResult<()>;
    async fn min(&self) -> RpcResult<f64>;
    async fn max(&self) -> RpcResult<f64>;
    async fn default_value(&self) -> RpcResult<f64>;

    async fn on_value_changed(&self, listener: ValueListener) -> RpcResult<Unsubscribe>;
}

#[async_trait(?Send)]
pub trait Clip {
    async fn name(&self) -> RpcResult<String>;
    async fn color(&self) -> RpcResult<DawColor>;

    async fn on_name_changed(&self, listener: StringListener) -> RpcResult<Unsubscribe>;
    async fn on_color_changed(&self, listener: ColorListener) -> RpcResult<Unsubscribe>;
}
