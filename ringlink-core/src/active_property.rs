/// Which per-track property the hardware's single generic encoder currently controls.
///
/// Replaces a stringly-typed mode (`"volume"`, `"send:2"`, ...) with a real tagged union — the
/// `Send` variant carries its own index instead of being smuggled into a formatted string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActiveProperty {
    Volume,
    Panning,
    Send(u32),
    SelectedParameter,
}

impl Default for ActiveProperty {
    fn default() -> Self {
        Self::Volume
    }
}
