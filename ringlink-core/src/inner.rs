use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ringlink_rpc::{DeviceParameter, MixerDevice, RgbColor, Song, Track, TrackId};

use crate::active_property::ActiveProperty;
use crate::config::RingManagerConfig;
use crate::events::SendMessage;
use crate::subscription_group::SubscriptionGroup;
use crate::track_state::TrackState;

/// Direction of an encoder-driven ring shift.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Everything the core caches about one ring-resident track: the live handles needed to issue
/// writes, and the mirrored state needed to answer reads without a round trip.
pub(crate) struct TrackEntry {
    pub track: Rc<dyn Track>,
    /// `None` for tracks without a mixer device (observed on some return/master configurations);
    /// volume/panning/send writes silently no-op against such a track.
    pub mixer: Option<Rc<dyn MixerDevice>>,
    pub state: TrackState,
}

/// The sliding window itself: its dimensions, its current offset, and the mapping from the track
/// ids it currently holds back to their position inside it.
#[derive(Default)]
pub(crate) struct RingWindow {
    pub width: u32,
    pub scenes: u32,
    pub track_offset: u32,
    pub scene_offset: u32,
    pub current_ring_track_ids: Vec<TrackId>,
    pub ring_index_by_track_id: HashMap<TrackId, usize>,
}

/// Bookkeeping for the parameter-switch guard: while a new selected parameter is being
/// fetched and subscribed, writes against the old one are rejected rather than landing on
/// whichever parameter happens to still be cached. `generation` is bumped on every selection
/// change so that a superseded in-flight switch can tell it's stale and discard its own result
/// instead of clobbering a newer one.
#[derive(Default)]
pub(crate) struct ParamSwitch {
    pub switching: bool,
    pub generation: u64,
}

/// Everything the focus subsystem mirrors about the DAW's current selection/transport state.
#[derive(Default)]
pub(crate) struct FocusState {
    pub selected_track_index: i32,
    pub selected_track_id: Option<TrackId>,
    pub selected_track_name: String,
    pub selected_track_color: RgbColor,

    pub playing_slot_index: i32,
    pub playing_clip_name: String,
    pub playing_clip_color: RgbColor,

    pub selected_param: Option<Rc<dyn DeviceParameter>>,
    pub selected_param_name: String,
    pub selected_param_value: f64,
    pub selected_param_min: f64,
    pub selected_param_max: f64,
    pub selected_param_default: f64,

    pub is_playing: bool,
    pub is_recording: bool,

    pub active_property: ActiveProperty,
}

/// Shared, `Rc`-counted core state. Listener closures close over clones of this `Rc` rather than
/// borrowing `&RingManager`, since they outlive any particular call into the core and must be
/// `'static`.
pub(crate) struct Inner {
    pub song: Rc<dyn Song>,
    pub sink: SendMessage,
    pub config: RingManagerConfig,

    pub ring_subs: SubscriptionGroup,
    pub focus_subs: SubscriptionGroup,

    pub ring: RefCell<RingWindow>,
    pub visible_tracks: RefCell<Vec<Rc<dyn Track>>>,
    pub tracks: RefCell<HashMap<TrackId, TrackEntry>>,
    pub focus: RefCell<FocusState>,
    pub param_switch: RefCell<ParamSwitch>,
}
