//! The subscription/diff engine that mirrors a sliding window of DAW tracks onto a hardware
//! control surface.
//!
//! [`RingManager`] is the only type most callers need: construct one over a
//! [`ringlink_rpc::Song`] and a sink, call [`RingManager::init`], then [`RingManager::setup_ring`]
//! once the hardware tells you its width. Everything else — what gets subscribed, what gets torn
//! down, what gets replayed on a window shift — is internal.

mod active_property;
mod builder;
mod commands;
mod config;
mod diff;
mod events;
mod focus;
mod inner;
mod ring_manager;
mod subscription_group;
mod track_state;

pub use active_property::ActiveProperty;
pub use config::RingManagerConfig;
pub use events::{OutboundEvent, ParamInfo, PlayingClipInfo, SendMessage};
pub use inner::Direction;
pub use ring_manager::RingManager;
pub use subscription_group::SubscriptionGroup;
pub use track_state::TrackState;

#[cfg(test)]
mod tests;
