mod auth;
mod identity;
mod records;
mod registry;
mod session;
mod util;
mod views;

use std::sync::Arc;

use sacristan_core::DocumentStore;

pub use auth::*;
pub use identity::*;
pub use records::*;
pub use registry::*;
pub use session::*;
pub use views::*;

pub use util::{is_valid_email, normalize_email};

/// The roster system: live schedule views, role resolution, and record
/// keeping, all over one document store and one identity provider.
pub struct Roster<S, P> {
    context: RosterContext<S, P>,

    pub views: Views<S>,
    pub registry: Registry<S>,
}

/// A type passed to components of the roster system, to access the store,
/// the identity provider, and the teacher allow-list.
pub struct RosterContext<S, P> {
    pub store: Arc<S>,
    pub provider: Arc<P>,
    pub allowlist: Allowlist,
}

impl<S, P> Roster<S, P>
where
    S: DocumentStore,
    P: IdentityProvider,
{
    /// Creates a new roster system with the provided store and identity
    /// provider.
    pub fn new(store: S, provider: P, allowlist: Allowlist) -> Self {
        let context = RosterContext {
            store: Arc::new(store),
            provider: Arc::new(provider),
            allowlist,
        };

        Self {
            views: Views::new(&context),
            registry: Registry::new(&context),
            context,
        }
    }

    /// Mounts a session. The observer starts receiving snapshots as the
    /// signed-in state and the resolved role change; detach the returned
    /// context to stop.
    pub fn attach_session<O>(&self, observer: O) -> SessionContext<P>
    where
        O: SessionObserver + 'static,
    {
        SessionContext::attach(&self.context, observer)
    }

    pub fn context(&self) -> &RosterContext<S, P> {
        &self.context
    }
}

// Can't be derived because of the generics.
impl<S, P> Clone for RosterContext<S, P> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            provider: self.provider.clone(),
            allowlist: self.allowlist.clone(),
        }
    }
}
