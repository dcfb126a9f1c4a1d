//! In-process session store
//!
//! Backs single-process rooms and the test suites. Mirrors the semantics the
//! dispatcher is written against: at-least-once delivery via a broadcast
//! channel, own writes echoed back to the publisher.

use super::{SessionStore, SessionToken};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::broadcast;

pub struct MemoryStore {
    tx: broadcast::Sender<SessionToken>,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn publish(&self, token: SessionToken) -> Result<()> {
        // No subscribers is fine; the next publish reaches whoever joined.
        let _ = self.tx.send(token);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionToken> {
        self.tx.subscribe()
    }
}
