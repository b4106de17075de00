use ringlink_rpc::RgbColor;

/// Everything the core can push out to the hardware surface.
///
/// This is the single event grammar shared by live change notifications and snapshot replays
/// (`send_full_sync`, `request_full_state`) — the surface-facing sink never has to know which one
/// produced a given event.
#[derive(Clone, Debug, PartialEq)]
pub enum OutboundEvent {
    Mute {
        ring_index: usize,
        value: bool,
    },
    Solo {
        ring_index: usize,
        value: bool,
    },
    Arm {
        ring_index: usize,
        value: bool,
    },
    Volume {
        ring_index: usize,
        value: f64,
        normalized: f64,
    },
    Panning {
        ring_index: usize,
        value: f64,
        normalized: f64,
    },
    Send {
        ring_index: usize,
        send_index: u32,
        value: f64,
        normalized: f64,
    },
    Info {
        ring_index: usize,
        name: String,
        color: RgbColor,
        is_midi: bool,
    },
    Selected {
        /// `-1` when nothing is selected.
        ring_index: i32,
        name: String,
        color: RgbColor,
    },
    PlayingClip(Option<PlayingClipInfo>),
    Param(Option<ParamInfo>),
    Transport {
        playing: bool,
        recording: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayingClipInfo {
    pub name: String,
    pub color: RgbColor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    pub value: f64,
    pub normalized: f64,
    pub min: f64,
    pub max: f64,
}

/// The sink the host hands the core at construction time. Fire-and-forget: the core never awaits
/// a response and never retries a failed send.
pub type SendMessage = Box<dyn Fn(OutboundEvent)>;
