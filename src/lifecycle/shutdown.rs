//! Shutdown coordination for the server.

use tokio_util::sync::CancellationToken;

/// Coordinator for graceful shutdown.
///
/// Every request gets a child token, so requests still waiting to reach
/// their handler stop once shutdown starts.
#[derive(Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token cancelled when shutdown is triggered.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is triggered.
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_cancels_children() {
        let shutdown = Shutdown::new();
        let child = shutdown.child_token();
        assert!(!child.is_cancelled());

        let waiter = shutdown.clone();
        let handle = tokio::spawn(async move { waiter.wait().await });

        shutdown.trigger();
        handle.await.unwrap();
        assert!(child.is_cancelled());
        assert!(shutdown.is_triggered());
    }
}
