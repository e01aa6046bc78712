//! Mirrors the auth session into an observable state container.
//!
//! One writer task owns the state. It races a "get current session" probe
//! against the auth change subscription and publishes every result through
//! a `watch` channel; readers only ever see whole [`SessionState`] values.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::supabase::{AuthChange, AuthClient, ClientError, Session, User};

/// Source of session snapshots and change notifications.
#[async_trait]
pub trait IdentityChannel: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;

    async fn current_session(&self) -> Result<Option<Session>, ClientError>;
}

#[async_trait]
impl IdentityChannel for AuthClient {
    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        AuthClient::subscribe(self)
    }

    async fn current_session(&self) -> Result<Option<Session>, ClientError> {
        self.get_session().await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Nothing known yet
    Uninitialized,
    Authenticated(Session),
    Unauthenticated,
}

impl SessionState {
    fn from_session(session: Option<Session>) -> Self {
        match session {
            Some(session) => SessionState::Authenticated(session),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Uninitialized)
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session().map(|session| &session.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSyncError {
    /// Session read outside [`SessionSynchronizer::scope`]
    OutsideScope,
}

impl fmt::Display for SessionSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionSyncError::OutsideScope => {
                write!(f, "session state read outside of a SessionSynchronizer scope")
            }
        }
    }
}

impl std::error::Error for SessionSyncError {}

tokio::task_local! {
    static CURRENT: watch::Receiver<SessionState>;
}

pub struct SessionSynchronizer {
    state: watch::Receiver<SessionState>,
    task: Option<JoinHandle<()>>,
}

impl SessionSynchronizer {
    /// Start synchronizing. Must be called inside a tokio runtime.
    ///
    /// With an `initial` snapshot the state starts `Authenticated` and no
    /// probe is issued; otherwise it starts `Uninitialized` until the probe
    /// or the first notification lands.
    pub fn start(channel: Arc<dyn IdentityChannel>, initial: Option<Session>) -> Self {
        // Subscribe before probing so no change between the two is lost.
        let events = channel.subscribe();

        let (first, probe) = match initial {
            Some(session) => (SessionState::Authenticated(session), false),
            None => (SessionState::Uninitialized, true),
        };
        let (tx, rx) = watch::channel(first);

        let task = tokio::spawn(run_writer(channel, events, tx, probe));

        Self {
            state: rx,
            task: Some(task),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// A receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until the state leaves `Uninitialized`.
    pub async fn loaded(&self) -> SessionState {
        let mut rx = self.state.clone();
        let settled = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        // A stopped writer leaves whatever it last published.
        settled.unwrap_or_else(|| rx.borrow().clone())
    }

    /// Run `fut` with this synchronizer as the current one for
    /// [`current_state`], [`current_session`] and [`current_user`].
    pub fn scope<F: Future>(&self, fut: F) -> impl Future<Output = F::Output> {
        CURRENT.scope(self.state.clone(), fut)
    }

    /// Unsubscribe and stop the writer. Nothing is published afterwards.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled is the expected outcome.
            let _ = task.await;
        }
        tracing::debug!("Session synchronizer stopped");
    }
}

impl Drop for SessionSynchronizer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_writer(
    channel: Arc<dyn IdentityChannel>,
    mut events: broadcast::Receiver<AuthChange>,
    tx: watch::Sender<SessionState>,
    mut probe_pending: bool,
) {
    let mut probe = channel.current_session();

    loop {
        tokio::select! {
            result = &mut probe, if probe_pending => {
                probe_pending = false;
                apply_probe(&tx, result);
            }
            received = events.recv() => match received {
                Ok(change) => {
                    tracing::debug!("Session change: {:?}", change.event);
                    tx.send_replace(SessionState::from_session(change.session));
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Session synchronizer missed {} auth events", missed);
                }
                Err(RecvError::Closed) => {
                    if probe_pending {
                        apply_probe(&tx, probe.await);
                    }
                    tracing::debug!("Auth channel closed");
                    break;
                }
            }
        }
    }
}

/// The probe only settles a state nothing else has settled yet.
fn apply_probe(tx: &watch::Sender<SessionState>, result: Result<Option<Session>, ClientError>) {
    let next = match result {
        Ok(session) => SessionState::from_session(session),
        Err(e) => {
            tracing::warn!("Session probe failed: {}", e);
            SessionState::Unauthenticated
        }
    };

    tx.send_if_modified(|current| {
        if current.is_loading() {
            *current = next;
            true
        } else {
            false
        }
    });
}

pub fn current_state() -> Result<SessionState, SessionSyncError> {
    CURRENT
        .try_with(|rx| rx.borrow().clone())
        .map_err(|_| SessionSyncError::OutsideScope)
}

pub fn current_session() -> Result<Option<Session>, SessionSyncError> {
    current_state().map(|state| state.session().cloned())
}

pub fn current_user() -> Result<Option<User>, SessionSyncError> {
    current_state().map(|state| state.user().cloned())
}
