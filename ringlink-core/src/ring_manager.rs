use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ringlink_rpc::{RpcResult, Song};
use tracing::{info, instrument};

use crate::config::RingManagerConfig;
use crate::events::{OutboundEvent, SendMessage};
use crate::inner::{FocusState, Inner, ParamSwitch, RingWindow};
use crate::subscription_group::SubscriptionGroup;

/// The stateful bridge between one DAW session and one hardware surface.
///
/// A `RingManager` owns no thread of its own: every method is an `async fn` meant to be driven
/// from the host's single-threaded executor, and every listener it registers fires back into that
/// same executor. There is exactly one logical worker and no cross-thread mutation to guard
/// against — deliberately, not as an oversight.
#[derive(Clone)]
pub struct RingManager {
    pub(crate) inner: Rc<Inner>,
}

impl RingManager {
    pub fn new(song: Rc<dyn Song>, sink: SendMessage, config: RingManagerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                song,
                sink,
                config,
                ring_subs: SubscriptionGroup::new(),
                focus_subs: SubscriptionGroup::new(),
                ring: RefCell::new(RingWindow::default()),
                visible_tracks: RefCell::new(Vec::new()),
                tracks: RefCell::new(HashMap::new()),
                focus: RefCell::new(FocusState::default()),
                param_switch: RefCell::new(ParamSwitch::default()),
            }),
        }
    }

    pub fn config(&self) -> RingManagerConfig {
        self.inner.config
    }

    /// Subscribes to session-wide events (track list, return tracks, transport, selection) that
    /// exist independently of any ring window. Call once, before `setup_ring`.
    #[instrument(skip_all)]
    pub async fn init(&self) -> RpcResult<()> {
        info!("initializing ring manager");
        self.refresh_visible_tracks().await?;
        self.subscribe_track_list_changed().await?;
        self.subscribe_return_tracks_changed().await?;
        self.init_focus().await?;
        Ok(())
    }

    /// Tears down every subscription the core holds and drops all cached state. Idempotent.
    #[instrument(skip_all)]
    pub async fn destroy(&self) {
        self.inner.ring_subs.clear().await;
        self.inner.focus_subs.clear().await;
        self.inner.tracks.borrow_mut().clear();
        self.inner.visible_tracks.borrow_mut().clear();
        *self.inner.ring.borrow_mut() = RingWindow::default();
        *self.inner.focus.borrow_mut() = FocusState::default();
    }

    /// Re-emits the full mirrored state of every ring resident plus the current focus snapshot,
    /// without touching the DAW. Used both by `sync_ring_listeners` after a window change and as
    /// the hardware's own "give me everything again" command.
    pub(crate) fn send_full_sync(&self) {
        let ring = self.inner.ring.borrow();
        let tracks = self.inner.tracks.borrow();
        for (ring_index, id) in ring.current_ring_track_ids.iter().enumerate() {
            let Some(entry) = tracks.get(id) else { continue };
            let state = &entry.state;
            (self.inner.sink)(OutboundEvent::Mute {
                ring_index,
                value: state.mute,
            });
            (self.inner.sink)(OutboundEvent::Solo {
                ring_index,
                value: state.solo,
            });
            (self.inner.sink)(OutboundEvent::Arm {
                ring_index,
                value: state.arm,
            });
            if !state.is_midi {
                (self.inner.sink)(OutboundEvent::Volume {
                    ring_index,
                    value: state.volume,
                    normalized: state.volume,
                });
                (self.inner.sink)(OutboundEvent::Panning {
                    ring_index,
                    value: state.panning,
                    normalized: (state.panning + 1.0) / 2.0,
                });
            }
            (self.inner.sink)(OutboundEvent::Info {
                ring_index,
                name: state.name.clone(),
                color: state.color,
                is_midi: state.is_midi,
            });
            for (send_index, value) in state.sends.iter().enumerate() {
                (self.inner.sink)(OutboundEvent::Send {
                    ring_index,
                    send_index: send_index as u32,
                    value: *value,
                    normalized: *value,
                });
            }
        }
    }

    /// The hardware-facing "resync everything" command: ring state plus the focus snapshot
    /// (selected track, playing clip, selected parameter, transport), all replayed from cache.
    pub async fn request_full_state(&self) {
        self.send_full_sync();
        self.emit_focus_snapshot();
    }
}
