//! An in-memory stand-in for the DAW-side collaborator, used to drive the core under test without
//! a real DAW. Tests reach into a [`World`] to simulate things happening "on the DAW side" (a
//! rename, a mute toggle from the hardware's own transport, a track being deleted) and assert on
//! what the core pushed out through its sink in response.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use ringlink_rpc::{
    BipolarValue, BipolarListener, BoolListener, Clip, ColorListener, DawColor, DeviceParameter,
    IntListener, MixerDevice, NormalizedListener, NormalizedValue, OptionParamListener,
    OptionTrackListener, RgbColor, RpcError, RpcResult, Song, SongView, StringListener, Track,
    TrackId, TrackListListener, Unsubscribe, ValueListener,
};

macro_rules! define_slot {
    ($name:ident, $value:ty) => {
        #[derive(Default)]
        pub struct $name {
            next_id: Cell<u64>,
            listeners: RefCell<HashMap<u64, Box<dyn Fn($value)>>>,
        }

        impl $name {
            pub fn add(&self, f: Box<dyn Fn($value)>) -> u64 {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                self.listeners.borrow_mut().insert(id, f);
                id
            }

            pub fn remove(&self, id: u64) {
                self.listeners.borrow_mut().remove(&id);
            }

            pub fn fire(&self, value: $value) {
                for f in self.listeners.borrow().values() {
                    f(value.clone());
                }
            }
        }
    };
}

define_slot!(BoolSlot, bool);
define_slot!(StringSlot, String);
define_slot!(ColorSlot, DawColor);
define_slot!(IntSlot, i32);
define_slot!(NormalizedSlot, NormalizedValue);
define_slot!(BipolarSlot, BipolarValue);
define_slot!(ValueSlot, f64);
define_slot!(TrackListSlot, Vec<Rc<dyn Track>>);
define_slot!(OptionTrackSlot, Option<Rc<dyn Track>>);
define_slot!(OptionParamSlot, Option<Rc<dyn DeviceParameter>>);

fn unsub(remove: impl Fn() + 'static) -> Unsubscribe {
    Box::new(move || {
        remove();
        Box::pin(async move { Ok(()) })
    })
}

pub struct FakeClipInner {
    self_weak: RefCell<Weak<FakeClipInner>>,
    name: RefCell<String>,
    color: Cell<DawColor>,
    name_listeners: StringSlot,
    color_listeners: ColorSlot,
}

impl FakeClipInner {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            self_weak: RefCell::new(weak.clone()),
            name: RefCell::new(name.to_string()),
            color: Cell::new(DawColor::Rgb(RgbColor::new(200, 30, 30))),
            name_listeners: StringSlot::default(),
            color_listeners: ColorSlot::default(),
        })
    }

    pub fn rename_external(&self, name: &str) {
        *self.name.borrow_mut() = name.to_string();
        self.name_listeners.fire(name.to_string());
    }
}

#[async_trait(?Send)]
impl Clip for FakeClipInner {
    async fn name(&self) -> RpcResult<String> {
        Ok(self.name.borrow().clone())
    }

    async fn color(&self) -> RpcResult<DawColor> {
        Ok(self.color.get())
    }

    async fn on_name_changed(&self, listener: StringListener) -> RpcResult<Unsubscribe> {
        let id = self.name_listeners.add(listener);
        let this = self.self_weak.borrow().upgrade().ok_or_else(|| RpcError::stale("clip gone"))?;
        Ok(unsub(move || this.name_listeners.remove(id)))
    }

    async fn on_color_changed(&self, listener: ColorListener) -> RpcResult<Unsubscribe> {
        let id = self.color_listeners.add(listener);
        let this = self.self_weak.borrow().upgrade().ok_or_else(|| RpcError::stale("clip gone"))?;
        Ok(unsub(move || this.color_listeners.remove(id)))
    }
}

pub struct FakeParamInner {
    self_weak: RefCell<Weak<FakeParamInner>>,
    name: RefCell<String>,
    value: Cell<f64>,
    min: Cell<f64>,
    max: Cell<f64>,
    default_value: Cell<f64>,
    value_listeners: ValueSlot,
}

impl FakeParamInner {
    pub fn new(name: &str, value: f64, min: f64, max: f64, default_value: f64) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            self_weak: RefCell::new(weak.clone()),
            name: RefCell::new(name.to_string()),
            value: Cell::new(value),
            min: Cell::new(min),
            max: Cell::new(max),
            default_value: Cell::new(default_value),
            value_listeners: ValueSlot::default(),
        })
    }

    pub fn set_value_external(&self, value: f64) {
        self.value.set(value);
        self.value_listeners.fire(value);
    }
}

#[async_trait(?Send)]
impl DeviceParameter for FakeParamInner {
    async fn name(&self) -> RpcResult<String> {
        Ok(self.name.borrow().clone())
    }

    async fn value(&self) -> RpcResult<f64> {
        Ok(self.value.get())
    }

    async fn set_value(&self, value: f64) -> RpcResult<()> {
        self.value.set(value);
        self.value_listeners.fire(value);
        Ok(())
    }

    async fn min(&self) -> RpcResult<f64> {
        Ok(self.min.get())
    }

    async fn max(&self) -> RpcResult<f64> {
        Ok(self.max.get())
    }

    async fn default_value(&self) -> RpcResult<f64> {
        Ok(self.default_value.get())
    }

    async fn on_value_changed(&self, listener: ValueListener) -> RpcResult<Unsubscribe> {
        let id = self.value_listeners.add(listener);
        let this = self
            .self_weak
            .borrow()
            .upgrade()
            .ok_or_else(|| RpcError::stale("parameter gone"))?;
        Ok(unsub(move || this.value_listeners.remove(id)))
    }
}

pub struct FakeMixerInner {
    self_weak: RefCell<Weak<FakeMixerInner>>,
    volume: Cell<f64>,
    panning: Cell<f64>,
    sends: RefCell<Vec<f64>>,
    volume_listeners: NormalizedSlot,
    panning_listeners: BipolarSlot,
    send_listeners: RefCell<HashMap<u32, NormalizedSlot>>,
}

impl FakeMixerInner {
    pub fn new(send_count: usize) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            self_weak: RefCell::new(weak.clone()),
            volume: Cell::new(0.5),
            panning: Cell::new(0.0),
            sends: RefCell::new(vec![0.0; send_count]),
            volume_listeners: NormalizedSlot::default(),
            panning_listeners: BipolarSlot::default(),
            send_listeners: RefCell::new(HashMap::new()),
        })
    }

    pub fn set_volume_external(&self, value: f64) {
        self.volume.set(value);
        self.volume_listeners.fire(NormalizedValue::new(value));
    }

    pub fn push_send(&self, value: f64) {
        self.sends.borrow_mut().push(value);
    }

    fn send_slot(&self, index: u32) -> std::cell::Ref<'_, HashMap<u32, NormalizedSlot>> {
        if !self.send_listeners.borrow().contains_key(&index) {
            self.send_listeners
                .borrow_mut()
                .insert(index, NormalizedSlot::default());
        }
        self.send_listeners.borrow()
    }
}

#[async_trait(?Send)]
impl MixerDevice for FakeMixerInner {
    async fn volume(&self) -> RpcResult<NormalizedValue> {
        Ok(NormalizedValue::new(self.volume.get()))
    }

    async fn set_volume(&self, value: NormalizedValue) -> RpcResult<()> {
        self.volume.set(value.get());
        self.volume_listeners.fire(value);
        Ok(())
    }

    async fn panning(&self) -> RpcResult<BipolarValue> {
        Ok(BipolarValue::new(self.panning.get()))
    }

    async fn set_panning(&self, value: BipolarValue) -> RpcResult<()> {
        self.panning.set(value.get());
        self.panning_listeners.fire(value);
        Ok(())
    }

    async fn send_count(&self) -> RpcResult<u32> {
        Ok(self.sends.borrow().len() as u32)
    }

    async fn send(&self, index: u32) -> RpcResult<NormalizedValue> {
        self.sends
            .borrow()
            .get(index as usize)
            .map(|v| NormalizedValue::new(*v))
            .ok_or_else(|| RpcError::stale("send index out of range"))
    }

    async fn set_send(&self, index: u32, value: NormalizedValue) -> RpcResult<()> {
        let mut sends = self.sends.borrow_mut();
        let Some(slot) = sends.get_mut(index as usize) else {
            return Err(RpcError::stale("send index out of range"));
        };
        *slot = value.get();
        drop(sends);
        if let Some(listeners) = self.send_listeners.borrow().get(&index) {
            listeners.fire(value);
        }
        Ok(())
    }

    async fn on_volume_changed(&self, listener: NormalizedListener) -> RpcResult<Unsubscribe> {
        let id = self.volume_listeners.add(listener);
        let this = self
            .self_weak
            .borrow()
            .upgrade()
            .ok_or_else(|| RpcError::stale("mixer gone"))?;
        Ok(unsub(move || this.volume_listeners.remove(id)))
    }

    async fn on_panning_changed(&self, listener: BipolarListener) -> RpcResult<Unsubscribe> {
        let id = self.panning_listeners.add(listener);
        let this = self
            .self_weak
            .borrow()
            .upgrade()
            .ok_or_else(|| RpcError::stale("mixer gone"))?;
        Ok(unsub(move || this.panning_listeners.remove(id)))
    }

    async fn on_send_changed(
        &self,
        index: u32,
        listener: NormalizedListener,
    ) -> RpcResult<Unsubscribe> {
        let id = self.send_slot(index).get(&index).unwrap().add(listener);
        let this = self
            .self_weak
            .borrow()
            .upgrade()
            .ok_or_else(|| RpcError::stale("mixer gone"))?;
        Ok(unsub(move || {
            if let Some(listeners) = this.send_listeners.borrow().get(&index) {
                listeners.remove(id);
            }
        }))
    }
}

pub struct FakeTrackInner {
    self_weak: RefCell<Weak<FakeTrackInner>>,
    id: TrackId,
    name: RefCell<String>,
    color: Cell<DawColor>,
    mute: Cell<bool>,
    solo: Cell<bool>,
    arm: Cell<bool>,
    can_be_armed: Cell<bool>,
    has_midi_input: Cell<bool>,
    has_audio_input: Cell<bool>,
    playing_slot_index: Cell<i32>,
    clip_slots: RefCell<HashMap<u32, Rc<FakeClipInner>>>,
    mixer: Option<Rc<FakeMixerInner>>,

    name_listeners: StringSlot,
    color_listeners: ColorSlot,
    mute_listeners: BoolSlot,
    solo_listeners: BoolSlot,
    arm_listeners: BoolSlot,
    playing_slot_listeners: IntSlot,
}

impl FakeTrackInner {
    pub fn new(id: &str, name: &str, mixer: Option<Rc<FakeMixerInner>>) -> Rc<Self> {
        Rc::new_cyclic(|weak| Self {
            self_weak: RefCell::new(weak.clone()),
            id: TrackId::new(id),
            name: RefCell::new(name.to_string()),
            color: Cell::new(DawColor::Rgb(RgbColor::new(10, 20, 30))),
            mute: Cell::new(false),
            solo: Cell::new(false),
            arm: Cell::new(false),
            can_be_armed: Cell::new(true),
            has_midi_input: Cell::new(false),
            has_audio_input: Cell::new(true),
            playing_slot_index: Cell::new(-1),
            clip_slots: RefCell::new(HashMap::new()),
            mixer,
            name_listeners: StringSlot::default(),
            color_listeners: ColorSlot::default(),
            mute_listeners: BoolSlot::default(),
            solo_listeners: BoolSlot::default(),
            arm_listeners: BoolSlot::default(),
            playing_slot_listeners: IntSlot::default(),
        })
    }

    pub fn rename_external(&self, name: &str) {
        *self.name.borrow_mut() = name.to_string();
        self.name_listeners.fire(name.to_string());
    }

    pub fn set_mute_external(&self, value: bool) {
        self.mute.set(value);
        self.mute_listeners.fire(value);
    }

    pub fn set_playing_slot_external(&self, index: i32) {
        self.playing_slot_index.set(index);
        self.playing_slot_listeners.fire(index);
    }

    pub fn put_clip(&self, index: u32, clip: Rc<FakeClipInner>) {
        self.clip_slots.borrow_mut().insert(index, clip);
    }

    pub fn mixer(&self) -> Option<Rc<FakeMixerInner>> {
        self.mixer.clone()
    }
}

#[async_trait(?Send)]
impl Track for FakeTrackInner {
    fn id(&self) -> TrackId {
        self.id.clone()
    }

    async fn name(&self) -> RpcResult<String> {
        Ok(self.name.borrow().clone())
    }

    async fn set_name(&self, name: &str) -> RpcResult<()> {
        *self.name.borrow_mut() = name.to_string();
        self.name_listeners.fire(name.to_string());
        Ok(())
    }

    async fn color(&self) -> RpcResult<DawColor> {
        Ok(self.color.get())
    }

    async fn mute(&self) -> RpcResult<bool> {
        Ok(self.mute.get())
    }

    async fn set_mute(&self, value: bool) -> RpcResult<()> {
        self.mute.set(value);
        self.mute_listeners.fire(value);
        Ok(())
    }

    async fn solo(&self) -> RpcResult<bool> {
        Ok(self.solo.get())
    }

    async fn set_solo(&self, value: bool) -> RpcResult<()> {
        self.solo.set(value);
        self.solo_listeners.fire(value);
        Ok(())
    }

    async fn arm(&self) -> RpcResult<bool> {
        Ok(self.arm.get())
    }

    async fn set_arm(&self, value: bool) -> RpcResult<()> {
        self.arm.set(value);
        self.arm_listeners.fire(value);
        Ok(())
    }

    async fn can_be_armed(&self) -> RpcResult<bool> {
        Ok(self.can_be_armed.get())
    }

    async fn has_midi_input(&self) -> RpcResult<bool> {
        Ok(self.has_midi_input.get())
    }

    async fn has_audio_input(&self) -> RpcResult<bool> {
        Ok(self.has_audio_input.get())
    }

    async fn playing_slot_index(&self) -> RpcResult<i32> {
        Ok(self.playing_slot_index.get())
    }

    async fn clip_slot(&self, index: u32) -> RpcResult<Option<Rc<dyn Clip>>> {
        Ok(self
            .clip_slots
            .borrow()
            .get(&index)
            .map(|c| c.clone() as Rc<dyn Clip>))
    }

    async fn mixer_device(&self) -> RpcResult<Rc<dyn MixerDevice>> {
        self.mixer
            .clone()
            .map(|m| m as Rc<dyn MixerDevice>)
            .ok_or_else(|| RpcError::other("no mixer device"))
    }

    async fn fire_slot(&self, index: u32) -> RpcResult<()> {
        self.set_playing_slot_external(index as i32);
        Ok(())
    }

    async fn on_name_changed(&self, listener: StringListener) -> RpcResult<Unsubscribe> {
        let id = self.name_listeners.add(listener);
        let this = self.upgrade()?;
        Ok(unsub(move || this.name_listeners.remove(id)))
    }

    async fn on_color_changed(&self, listener: ColorListener) -> RpcResult<Unsubscribe> {
        let id = self.color_listeners.add(listener);
        let this = self.upgrade()?;
        Ok(unsub(move || this.color_listeners.remove(id)))
    }

    async fn on_mute_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe> {
        let id = self.mute_listeners.add(listener);
        let this = self.upgrade()?;
        Ok(unsub(move || this.mute_listeners.remove(id)))
    }

    async fn on_solo_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe> {
        let id = self.solo_listeners.add(listener);
        let this = self.upgrade()?;
        Ok(unsub(move || this.solo_listeners.remove(id)))
    }

    async fn on_arm_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe> {
        let id = self.arm_listeners.add(listener);
        let this = self.upgrade()?;
        Ok(unsub(move || this.arm_listeners.remove(id)))
    }

    async fn on_playing_slot_index_changed(&self, listener: IntListener) -> RpcResult<Unsubscribe> {
        let id = self.playing_slot_listeners.add(listener);
        let this = self.upgrade()?;
        Ok(unsub(move || this.playing_slot_listeners.remove(id)))
    }
}

impl FakeTrackInner {
    fn upgrade(&self) -> RpcResult<Rc<FakeTrackInner>> {
        self.self_weak
            .borrow()
            .upgrade()
            .ok_or_else(|| RpcError::stale("track gone"))
    }
}

#[derive(Default)]
pub struct World {
    pub tracks: RefCell<Vec<Rc<FakeTrackInner>>>,
    pub return_tracks: RefCell<Vec<Rc<FakeTrackInner>>>,
    pub master: RefCell<Option<Rc<FakeTrackInner>>>,
    pub is_playing: Cell<bool>,
    pub record_mode: Cell<bool>,
    pub selected_track: RefCell<Option<Rc<FakeTrackInner>>>,
    pub selected_param: RefCell<Option<Rc<FakeParamInner>>>,
    pub selected_scene: Cell<u32>,
    pub session_box: Cell<(u32, u32)>,
    pub session_offset: Cell<(u32, u32)>,

    track_list_listeners: TrackListSlot,
    return_tracks_listeners: TrackListSlot,
    is_playing_listeners: BoolSlot,
    record_mode_listeners: BoolSlot,
    selected_track_listeners: OptionTrackSlot,
    selected_param_listeners: OptionParamSlot,
}

impl World {
    pub fn new() -> Rc<Self> {
        let world = Rc::new(Self::default());
        *world.master.borrow_mut() = Some(FakeTrackInner::new("master", "Master", None));
        world
    }

    pub fn push_track(&self, track: Rc<FakeTrackInner>) {
        self.tracks.borrow_mut().push(track);
        self.fire_track_list();
    }

    pub fn remove_track(&self, id: &str) {
        self.tracks.borrow_mut().retain(|t| t.id.as_str() != id);
        self.fire_track_list();
    }

    pub fn reorder(&self, order: &[&str]) {
        let mut tracks = self.tracks.borrow_mut();
        tracks.sort_by_key(|t| order.iter().position(|id| *id == t.id.as_str()).unwrap_or(usize::MAX));
        drop(tracks);
        self.fire_track_list();
    }

    fn fire_track_list(&self) {
        let list: Vec<Rc<dyn Track>> = self
            .tracks
            .borrow()
            .iter()
            .map(|t| t.clone() as Rc<dyn Track>)
            .collect();
        self.track_list_listeners.fire(list);
    }

    pub fn push_return_track(&self, track: Rc<FakeTrackInner>) {
        self.return_tracks.borrow_mut().push(track);
        let list: Vec<Rc<dyn Track>> = self
            .return_tracks
            .borrow()
            .iter()
            .map(|t| t.clone() as Rc<dyn Track>)
            .collect();
        self.return_tracks_listeners.fire(list);
    }

    pub fn select_track(&self, track: Option<Rc<FakeTrackInner>>) {
        *self.selected_track.borrow_mut() = track.clone();
        self.selected_track_listeners
            .fire(track.map(|t| t.clone() as Rc<dyn Track>));
    }

    pub fn select_param(&self, param: Option<Rc<FakeParamInner>>) {
        *self.selected_param.borrow_mut() = param.clone();
        self.selected_param_listeners
            .fire(param.map(|p| p.clone() as Rc<dyn DeviceParameter>));
    }

    pub fn set_playing_external(&self, value: bool) {
        self.is_playing.set(value);
        self.is_playing_listeners.fire(value);
    }

    pub fn set_record_mode_external(&self, value: bool) {
        self.record_mode.set(value);
        self.record_mode_listeners.fire(value);
    }

    pub fn track_by_id(&self, id: &str) -> Option<Rc<FakeTrackInner>> {
        self.tracks.borrow().iter().find(|t| t.id.as_str() == id).cloned()
    }
}

pub struct FakeSong {
    world: Rc<World>,
    view: Rc<FakeSongView>,
}

impl FakeSong {
    pub fn new(world: Rc<World>) -> Rc<Self> {
        let view = Rc::new(FakeSongView {
            world: world.clone(),
        });
        Rc::new(Self { world, view })
    }
}

#[async_trait(?Send)]
impl Song for FakeSong {
    async fn tracks(&self) -> RpcResult<Vec<Rc<dyn Track>>> {
        Ok(self
            .world
            .tracks
            .borrow()
            .iter()
            .map(|t| t.clone() as Rc<dyn Track>)
            .collect())
    }

    async fn return_tracks(&self) -> RpcResult<Vec<Rc<dyn Track>>> {
        Ok(self
            .world
            .return_tracks
            .borrow()
            .iter()
            .map(|t| t.clone() as Rc<dyn Track>)
            .collect())
    }

    async fn visible_tracks(&self) -> RpcResult<Vec<Rc<dyn Track>>> {
        self.tracks().await
    }

    async fn master_track(&self) -> RpcResult<Rc<dyn Track>> {
        self.world
            .master
            .borrow()
            .clone()
            .map(|t| t as Rc<dyn Track>)
            .ok_or_else(|| RpcError::stale("no master track"))
    }

    async fn is_playing(&self) -> RpcResult<bool> {
        Ok(self.world.is_playing.get())
    }

    async fn record_mode(&self) -> RpcResult<bool> {
        Ok(self.world.record_mode.get())
    }

    async fn start_playing(&self) -> RpcResult<()> {
        self.world.set_playing_external(true);
        Ok(())
    }

    async fn stop_playing(&self) -> RpcResult<()> {
        self.world.set_playing_external(false);
        Ok(())
    }

    async fn setup_session_box(&self, width: u32, height: u32) -> RpcResult<()> {
        self.world.session_box.set((width, height));
        Ok(())
    }

    async fn set_session_offset(&self, track_offset: u32, scene_offset: u32) -> RpcResult<()> {
        self.world.session_offset.set((track_offset, scene_offset));
        Ok(())
    }

    async fn on_track_list_changed(&self, listener: TrackListListener) -> RpcResult<Unsubscribe> {
        let id = self.world.track_list_listeners.add(listener);
        let world = self.world.clone();
        Ok(unsub(move || world.track_list_listeners.remove(id)))
    }

    async fn on_return_tracks_changed(&self, listener: TrackListListener) -> RpcResult<Unsubscribe> {
        let id = self.world.return_tracks_listeners.add(listener);
        let world = self.world.clone();
        Ok(unsub(move || world.return_tracks_listeners.remove(id)))
    }

    async fn on_is_playing_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe> {
        let id = self.world.is_playing_listeners.add(listener);
        let world = self.world.clone();
        Ok(unsub(move || world.is_playing_listeners.remove(id)))
    }

    async fn on_record_mode_changed(&self, listener: BoolListener) -> RpcResult<Unsubscribe> {
        let id = self.world.record_mode_listeners.add(listener);
        let world = self.world.clone();
        Ok(unsub(move || world.record_mode_listeners.remove(id)))
    }

    fn view(&self) -> Rc<dyn SongView> {
        self.view.clone()
    }
}

pub struct FakeSongView {
    world: Rc<World>,
}

#[async_trait(?Send)]
impl SongView for FakeSongView {
    async fn selected_track(&self) -> RpcResult<Option<Rc<dyn Track>>> {
        Ok(self
            .world
            .selected_track
            .borrow()
            .clone()
            .map(|t| t as Rc<dyn Track>))
    }

    async fn selected_parameter(&self) -> RpcResult<Option<Rc<dyn DeviceParameter>>> {
        Ok(self
            .world
            .selected_param
            .borrow()
            .clone()
            .map(|p| p as Rc<dyn DeviceParameter>))
    }

    async fn selected_scene(&self) -> RpcResult<u32> {
        Ok(self.world.selected_scene.get())
    }

    async fn on_selected_track_changed(
        &self,
        listener: OptionTrackListener,
    ) -> RpcResult<Unsubscribe> {
        let id = self.world.selected_track_listeners.add(listener);
        let world = self.world.clone();
        Ok(unsub(move || world.selected_track_listeners.remove(id)))
    }

    async fn on_selected_parameter_changed(
        &self,
        listener: OptionParamListener,
    ) -> RpcResult<Unsubscribe> {
        let id = self.world.selected_param_listeners.add(listener);
        let world = self.world.clone();
        Ok(unsub(move || world.selected_param_listeners.remove(id)))
    }
}
