//! Race token
//!
//! Monotonic counter that orders every intent to play something. An async
//! continuation captures the value when its operation is issued and checks
//! it again right before mutating shared state; a newer value means the
//! continuation lost the race and must abandon.
//!
//! Backed by a `watch` channel so a suspended wait (the jingle) can also
//! await supersession instead of polling for it.

use tokio::sync::watch;

/// Captured token value
pub type Token = u64;

pub struct RaceToken {
    tx: watch::Sender<Token>,
}

impl RaceToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Bump the counter and return the new value
    pub fn issue(&self) -> Token {
        let mut issued = 0;
        self.tx.send_modify(|value| {
            *value += 1;
            issued = *value;
        });
        issued
    }

    pub fn current(&self) -> Token {
        *self.tx.borrow()
    }

    pub fn is_current(&self, token: Token) -> bool {
        self.current() == token
    }

    /// Resolves once a newer token has been issued after `token`
    pub async fn superseded(&self, token: Token) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close while borrowed
        let _ = rx.wait_for(|value| *value != token).await;
    }
}

impl Default for RaceToken {
    fn default() -> Self {
        Self::new()
    }
}
