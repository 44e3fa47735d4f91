//! In-process customer events.
//!
//! Listeners in the same process (cart merge, analytics) subscribe to
//! [`LoginEvents`] to learn about logins as they are finalised.

use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{CurrentCustomer, SessionToken};

/// Buffered events per subscriber before the oldest are dropped.
const CHANNEL_CAPACITY: usize = 64;

/// Published once per completed login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerLoginEvent {
    pub token: SessionToken,
    pub customer: CurrentCustomer,
    pub is_employee: bool,
    pub permissions: Vec<String>,
}

/// Broadcast channel for [`CustomerLoginEvent`]s.
#[derive(Clone)]
pub struct LoginEvents {
    sender: broadcast::Sender<CustomerLoginEvent>,
}

impl LoginEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to future login events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CustomerLoginEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: CustomerLoginEvent) {
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(receivers, "Published customer login event");
    }
}

impl Default for LoginEvents {
    fn default() -> Self {
        Self::new()
    }
}
