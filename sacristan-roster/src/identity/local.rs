use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use rand::rngs::OsRng;

use sacristan_core::random_string;

use crate::util::{is_valid_email, normalize_email};

use super::{Identity, IdentityProvider, ListenerHandle, NewAccount, ProviderError, StateListener};

/// An in-process identity provider backed by locally registered accounts.
///
/// Stands in for the hosted credential service in tests and offline use,
/// with the same observable behavior: hashed passwords, a single signed-in
/// account, and a connection-state stream.
pub struct LocalProvider {
    argon: Argon2<'static>,
    state: Arc<Mutex<ProviderState>>,
}

#[derive(Default)]
struct ProviderState {
    accounts: Vec<Account>,
    pending_tokens: HashMap<String, PendingExternal>,
    signed_in: Option<Identity>,
    listeners: Vec<Listener>,
    listener_ids: u64,
}

struct Account {
    uid: String,
    email: String,
    /// Unset for accounts created through an external flow.
    password: Option<String>,
    display_name: String,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

struct PendingExternal {
    email: String,
    display_name: String,
}

struct Listener {
    id: u64,
    callback: Arc<StateListener>,
}

impl LocalProvider {
    const MIN_PASSWORD_LENGTH: usize = 8;
    const UID_LENGTH: usize = 28;

    pub fn new() -> Self {
        Self {
            argon: Argon2::default(),
            state: Default::default(),
        }
    }

    /// Registers a completed external flow, the way the provider's popup
    /// would after the user finishes it. The token can then be redeemed
    /// once with [IdentityProvider::sign_in_external].
    pub fn authorize_external(
        &self,
        token: impl Into<String>,
        email: &str,
        display_name: impl Into<String>,
    ) {
        self.state.lock().pending_tokens.insert(
            token.into(),
            PendingExternal {
                email: normalize_email(email),
                display_name: display_name.into(),
            },
        );
    }

    fn set_signed_in(&self, identity: Option<Identity>) {
        let listeners: Vec<Arc<StateListener>> = {
            let mut state = self.state.lock();
            state.signed_in = identity.clone();
            state.listeners.iter().map(|l| l.callback.clone()).collect()
        };

        for listener in listeners {
            (*listener)(identity.clone())
        }
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let email = normalize_email(email);

        let (identity, stored_password) = {
            let state = self.state.lock();

            let account = state
                .accounts
                .iter()
                .find(|account| account.email == email)
                .ok_or(ProviderError::InvalidCredentials)?;

            let stored_password = account
                .password
                .clone()
                .ok_or(ProviderError::InvalidCredentials)?;

            (account.identity(), stored_password)
        };

        let stored_password = PasswordHash::parse(&stored_password, Encoding::default())
            .map_err(|e| ProviderError::HashError(e.to_string()))?;

        self.argon
            .verify_password(password.as_bytes(), &stored_password)
            .map_err(|_| ProviderError::InvalidCredentials)?;

        debug!("{} signed in", identity.email);
        self.set_signed_in(Some(identity.clone()));

        Ok(identity)
    }

    async fn sign_up(&self, new_account: NewAccount) -> Result<Identity, ProviderError> {
        let email = normalize_email(&new_account.email);

        if !is_valid_email(&email) {
            return Err(ProviderError::InvalidEmail(new_account.email));
        }

        if new_account.password.len() < Self::MIN_PASSWORD_LENGTH {
            return Err(ProviderError::WeakPassword(Self::MIN_PASSWORD_LENGTH));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(new_account.password.as_bytes(), &salt)
            .map_err(|e| ProviderError::HashError(e.to_string()))?
            .to_string();

        let identity = {
            let mut state = self.state.lock();

            if state.accounts.iter().any(|account| account.email == email) {
                return Err(ProviderError::EmailTaken);
            }

            let account = Account {
                uid: random_string(Self::UID_LENGTH),
                email,
                password: Some(hashed_password),
                display_name: new_account.display_name,
            };

            let identity = account.identity();
            state.accounts.push(account);

            identity
        };

        debug!("{} signed up", identity.email);
        self.set_signed_in(Some(identity.clone()));

        Ok(identity)
    }

    async fn sign_in_external(&self, token: &str) -> Result<Identity, ProviderError> {
        let identity = {
            let mut state = self.state.lock();

            // A token that was never authorized means the user abandoned
            // the flow.
            let pending = state
                .pending_tokens
                .remove(token)
                .ok_or(ProviderError::Cancelled)?;

            let existing = state
                .accounts
                .iter()
                .find(|account| account.email == pending.email);

            match existing {
                Some(account) => account.identity(),
                None => {
                    let account = Account {
                        uid: random_string(Self::UID_LENGTH),
                        email: pending.email,
                        password: None,
                        display_name: pending.display_name,
                    };

                    let identity = account.identity();
                    state.accounts.push(account);

                    identity
                }
            }
        };

        debug!("{} signed in externally", identity.email);
        self.set_signed_in(Some(identity.clone()));

        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_signed_in(None);

        Ok(())
    }

    fn current(&self) -> Option<Identity> {
        self.state.lock().signed_in.clone()
    }

    fn on_state_change(&self, listener: StateListener) -> ListenerHandle {
        let callback: Arc<StateListener> = Arc::new(listener);

        let (id, current) = {
            let mut state = self.state.lock();

            let id = state.listener_ids;
            state.listener_ids += 1;

            state.listeners.push(Listener {
                id,
                callback: callback.clone(),
            });

            (id, state.signed_in.clone())
        };

        // Registration always reports the state as it is right now.
        (*callback)(current);

        let state = self.state.clone();

        ListenerHandle::new(move || {
            state.lock().listeners.retain(|listener| listener.id != id);
        })
    }
}
