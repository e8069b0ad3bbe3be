use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

mod local;

pub use local::*;

/// The signed-in account as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Email or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Passwords must be at least {0} characters")]
    WeakPassword(usize),
    /// The external sign-in flow ended before it was authorized
    #[error("Sign-in was cancelled")]
    Cancelled,
    #[error("The identity provider could not be reached: {0}")]
    Unavailable(String),
    #[error("HashError: {0}")]
    HashError(String),
}

/// A new password account.
#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Receives the connection state every time it changes. `None` means nobody
/// is signed in.
pub type StateListener = Box<dyn Fn(Option<Identity>) + Send + Sync>;

/// Handle to a connection-state listener registration. Detaching stops the
/// callbacks; dropping the handle detaches it as well. A leaked handle is a
/// leaked listener.
pub struct ListenerHandle {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerHandle {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// Unregisters the listener. Detaching twice is a no-op.
    pub fn detach(&self) {
        if let Some(detach) = self.detach.lock().take() {
            detach()
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Represents the credential service that authenticates accounts and
/// reports connection state.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Signs into an existing account with an email and password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    /// Creates a password account and signs into it.
    async fn sign_up(&self, new_account: NewAccount) -> Result<Identity, ProviderError>;

    /// Completes a sign-in that an external flow already authorized,
    /// exchanging the flow's token for an identity.
    async fn sign_in_external(&self, token: &str) -> Result<Identity, ProviderError>;

    /// Signs out the current account, if any.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Returns the currently signed-in identity, if any.
    fn current(&self) -> Option<Identity>;

    /// Registers a connection-state listener. The listener fires with the
    /// current state immediately, then on every transition, until the
    /// handle detaches.
    fn on_state_change(&self, listener: StateListener) -> ListenerHandle;
}
