//! # mixdeck Play Director (mixdeck-pd)
//!
//! Collaborative party-playlist playback core: an intent-driven state
//! machine over two alternating player slots, with crossfade transitions,
//! clock-independent position sync between devices, and an HTTP/SSE
//! control interface.
//!
//! **Architecture:** one dispatcher task owns all playback state; user
//! intents, player events, and timer ticks are serialized through a single
//! command channel. Synchronization between devices happens through a
//! session-token document store, never through clock exchange.

pub mod api;
pub mod config;
pub mod director;
pub mod error;
pub mod player;
pub mod search;
pub mod sync;
pub mod track;

pub use config::DirectorConfig;
pub use director::{Director, DirectorSnapshot, PlaybackIntent};
pub use error::{Error, Result};
