use ringlink_rpc::RgbColor;

/// The core's own mirror of a ring-resident track's mixer-relevant properties.
///
/// Every field here is also a field the focus subsystem or a command handler reads back before
/// issuing a write (e.g. `adjust_active_property_value` needs the current volume to add a step to
/// it) — keeping it on this struct, rather than re-fetching from the DAW, is what makes those
/// writes synchronous from the surface's point of view.
#[derive(Clone, Debug, Default)]
pub struct TrackState {
    pub name: String,
    pub color: RgbColor,
    pub is_midi: bool,
    pub mute: bool,
    pub solo: bool,
    pub arm: bool,
    pub can_be_armed: bool,
    pub volume: f64,
    pub panning: f64,
    pub sends: Vec<f64>,
}
