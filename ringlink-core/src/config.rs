use ringlink_rpc::NormalizedValue;

/// Tunables that would otherwise be magic numbers scattered across the focus subsystem and the
/// command handlers.
#[derive(Copy, Clone, Debug)]
pub struct RingManagerConfig {
    /// Step size of one encoder detent against a `[0, 1]` parameter, expressed as a fraction of
    /// full travel. `1/127` matches a single MIDI CC increment.
    pub encoder_step: f64,
    /// What volume/panning/send reset to on a double-press, absent a DAW-reported default.
    pub default_reset_volume: NormalizedValue,
}

impl Default for RingManagerConfig {
    fn default() -> Self {
        Self {
            encoder_step: 1.0 / 127.0,
            default_reset_volume: NormalizedValue::new(0.85),
        }
    }
}
