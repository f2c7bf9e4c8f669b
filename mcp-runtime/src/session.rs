use std::future::Future;
use std::sync::{Arc, RwLock};

use tokio::sync::OnceCell;

/// One proxy target together with the upstream session negotiated against it.
///
/// The token cell is filled at most once per binding; a target change creates a new
/// binding, which is the only way a cached token is discarded.
#[derive(Debug)]
pub struct UpstreamBinding {
    target: String,
    token: OnceCell<Option<String>>,
}

impl UpstreamBinding {
    fn new(target: String) -> Self {
        Self {
            target,
            token: OnceCell::new(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_established(&self) -> bool {
        self.token.initialized()
    }

    /// The cached token, if the session is established and the upstream issued one.
    pub fn token(&self) -> Option<&str> {
        self.token.get().and_then(|token| token.as_deref())
    }

    /// Runs `handshake` unless the session is already established.
    ///
    /// Concurrent first callers wait on a single handshake. A failed handshake leaves
    /// the binding unestablished so the next call retries.
    pub async fn establish<F, Fut, E>(&self, handshake: F) -> Result<Option<&str>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>, E>>,
    {
        let token = self.token.get_or_try_init(handshake).await?;
        Ok(token.as_deref())
    }
}

/// Process-wide proxy state: the current target binding, swapped atomically.
#[derive(Debug, Default)]
pub struct ProxySession {
    current: RwLock<Option<Arc<UpstreamBinding>>>,
}

impl ProxySession {
    pub fn new(target: Option<String>) -> Self {
        Self {
            current: RwLock::new(binding_for(target)),
        }
    }

    /// The binding in effect right now. Callers keep using it even if the target changes.
    pub fn snapshot(&self) -> Option<Arc<UpstreamBinding>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn target(&self) -> Option<String> {
        self.snapshot().map(|binding| binding.target().to_string())
    }

    /// Replaces the target and always drops the cached upstream session, even when
    /// the new target equals the old one. An empty string clears the target.
    pub fn set_target(&self, target: Option<String>) -> Option<String> {
        let next = binding_for(target);
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *current, next);
        previous.map(|binding| binding.target().to_string())
    }
}

fn binding_for(target: Option<String>) -> Option<Arc<UpstreamBinding>> {
    target
        .filter(|t| !t.trim().is_empty())
        .map(|t| Arc::new(UpstreamBinding::new(t)))
}
