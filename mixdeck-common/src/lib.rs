//! # mixdeck shared types (mixdeck-common)
//!
//! Value types, playback state enum, typed event bus, and human-time helpers
//! shared between the Play Director service and anything that renders it.

pub mod events;
pub mod human_time;
pub mod types;

pub use events::{EventBus, PartyEvent};
pub use types::{PlaybackState, Track};
