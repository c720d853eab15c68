use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
pub(crate) struct SessionState {
    token: Option<String>,
    generation: u64,
}

impl SessionState {
    /// Generation of the current sign-in, or `None` when signed out.
    pub(crate) fn identity(&self) -> Option<u64> {
        self.token.as_ref().map(|_| self.generation)
    }
}

/// The signed-in identity shared by the request executor and the cart store.
///
/// Every sign-in and sign-out bumps a generation counter, so holders can tell
/// that the identity behind a cached cart changed even when a new token
/// replaced the old one without a sign-out in between. Changes are published
/// to [`Session::subscribe`] receivers as they happen.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(state),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts either a bare token or an `Authorization` value (`Bearer <token>`).
    pub fn sign_in(&self, token: impl AsRef<str>) {
        let token = token.as_ref().trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();

        self.state.send_modify(|state| {
            state.token = Some(token.to_string());
            state.generation += 1;
            tracing::debug!(generation = state.generation, "session signed in");
        });
    }

    pub fn sign_out(&self) {
        self.state.send_if_modified(|state| {
            if state.token.take().is_none() {
                return false;
            }
            state.generation += 1;
            tracing::debug!(generation = state.generation, "session signed out");
            true
        });
    }

    pub fn bearer(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Generation of the current sign-in, or `None` when signed out.
    pub fn identity(&self) -> Option<u64> {
        self.state.borrow().identity()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
