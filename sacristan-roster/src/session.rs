use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use sacristan_core::DocumentStore;

use crate::{
    confirm_role, Allowlist, Identity, IdentityProvider, ListenerHandle, NewAccount, ProviderError,
    Role, RoleResolution, RosterContext,
};

/// A point-in-time view of the session: who is signed in and what they may
/// do. The role is live; it can be revised once the authoritative document
/// check lands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub resolution: RoleResolution,
    pub role: Role,
    pub is_teacher: bool,
    pub is_student: bool,
    /// True until the provider has reported the signed-in state once.
    pub loading: bool,
    /// The most recent credential failure, for display. Cleared by the next
    /// successful credential call.
    pub last_error: Option<String>,
}

/// Receives a session snapshot on every identity or role change.
pub trait SessionObserver: Send + Sync {
    fn on_session(&self, snapshot: SessionSnapshot);
}

impl<F> SessionObserver for F
where
    F: Fn(SessionSnapshot) + Send + Sync,
{
    fn on_session(&self, snapshot: SessionSnapshot) {
        self(snapshot)
    }
}

struct SessionState {
    /// Bumped on every identity transition, so a document check that
    /// straddles a transition can tell it has gone stale.
    epoch: u64,
    identity: Option<Identity>,
    resolution: RoleResolution,
    loading: bool,
    last_error: Option<String>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        let role = self.resolution.role();

        SessionSnapshot {
            identity: self.identity.clone(),
            resolution: self.resolution,
            role,
            is_teacher: role == Role::Teacher,
            is_student: role == Role::Student,
            loading: self.loading,
            last_error: self.last_error.clone(),
        }
    }
}

struct SessionInner {
    allowlist: Allowlist,
    state: Mutex<SessionState>,
    observer: Box<dyn SessionObserver>,
}

/// The per-client session holder.
///
/// Attaching subscribes to the identity provider's connection-state stream
/// and resolves the caller's role in two phases: an instant allow-list
/// check on every sign-in, followed by an asynchronous read of the
/// authoritative role document. Snapshot deliveries are serialized; the
/// observer must not call back into the session from inside one.
pub struct SessionContext<P> {
    provider: Arc<P>,
    inner: Arc<SessionInner>,
    listener: ListenerHandle,
}

impl<P> SessionContext<P>
where
    P: IdentityProvider,
{
    /// Mounts the session. The provider reports the current signed-in
    /// state to the new listener right away, so the observer receives its
    /// first snapshot during the call.
    pub fn attach<S, O>(context: &RosterContext<S, P>, observer: O) -> Self
    where
        S: DocumentStore,
        O: SessionObserver + 'static,
    {
        let inner = Arc::new(SessionInner {
            allowlist: context.allowlist.clone(),
            state: Mutex::new(SessionState {
                epoch: 0,
                identity: None,
                resolution: RoleResolution::Unknown,
                loading: true,
                last_error: None,
            }),
            observer: Box::new(observer),
        });

        let listener = {
            let inner = inner.clone();
            let store = context.store.clone();

            context.provider.on_state_change(Box::new(move |identity| {
                handle_state_change(&inner, &store, identity)
            }))
        };

        Self {
            provider: context.provider.clone(),
            inner,
            listener,
        }
    }

    /// Signs in with an email and password. A failure is recorded on the
    /// session for display, then returned.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let result = self.provider.sign_in(email, password).await;
        self.record(result)
    }

    /// Creates a password account and signs into it.
    pub async fn sign_up(&self, new_account: NewAccount) -> Result<Identity, ProviderError> {
        let result = self.provider.sign_up(new_account).await;
        self.record(result)
    }

    /// Completes an externally authorized sign-in.
    pub async fn sign_in_external(&self, token: &str) -> Result<Identity, ProviderError> {
        let result = self.provider.sign_in_external(token).await;
        self.record(result)
    }

    pub async fn sign_out(&self) -> Result<(), ProviderError> {
        let result = self.provider.sign_out().await;
        self.record(result)
    }

    /// Reads the current snapshot without waiting for a delivery.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Unsubscribes from the provider's state stream. Dropping the context
    /// does the same.
    pub fn detach(self) {
        self.listener.detach();
    }

    fn record<T>(&self, result: Result<T, ProviderError>) -> Result<T, ProviderError> {
        let error = result.as_ref().err().map(|e| e.to_string());

        let mut state = self.inner.state.lock();

        if state.last_error != error {
            state.last_error = error;

            let snapshot = state.snapshot();
            self.inner.observer.on_session(snapshot);
        }

        result
    }
}

/// Applies an identity transition: the optimistic allow-list check runs
/// inline, and when it matches, the authoritative document check follows in
/// the background.
fn handle_state_change<S>(inner: &Arc<SessionInner>, store: &Arc<S>, identity: Option<Identity>)
where
    S: DocumentStore,
{
    let (resolution, epoch) = {
        let mut state = inner.state.lock();

        state.epoch += 1;
        state.identity = identity.clone();
        state.loading = false;
        state.resolution = match &identity {
            Some(identity) => inner.allowlist.resolve_email(&identity.email),
            None => RoleResolution::Unknown,
        };

        let snapshot = state.snapshot();
        inner.observer.on_session(snapshot);

        (state.resolution, state.epoch)
    };

    if resolution == RoleResolution::EmailMatched {
        if let Some(identity) = identity {
            confirm(inner.clone(), store.clone(), identity.uid, epoch);
        }
    }
}

/// Runs the authoritative document check and folds the outcome back into
/// the session, unless a newer identity transition has superseded it.
fn confirm<S>(inner: Arc<SessionInner>, store: Arc<S>, uid: String, epoch: u64)
where
    S: DocumentStore,
{
    tokio::spawn(async move {
        let exists = confirm_role(&*store, &uid).await;

        let mut state = inner.state.lock();

        if state.epoch != epoch {
            return;
        }

        state.resolution = state.resolution.after_document_check(exists);

        let snapshot = state.snapshot();
        inner.observer.on_session(snapshot);
    });
}
